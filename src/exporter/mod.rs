use crate::collector::{CollectionEngine, config::Settings, spec::MetricSpec};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span, warn};
use ulid::Ulid;

mod handlers;
mod shutdown;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = if let Some(hash) = built_info::GIT_COMMIT_HASH {
    hash
} else {
    ":-("
};

/// Start the exposition server: build the collection engine, attempt one
/// eager connect, and serve `/metrics` and `/health` until a shutdown
/// signal arrives.
///
/// A failed initial connection is logged but not fatal — the endpoint must
/// keep answering with cached or empty results while the database is down,
/// so that "is the exporter alive" stays distinct from "is the database
/// reachable".
///
/// # Errors
///
/// Returns an error when the configuration yields no valid connection URL or
/// the listen socket cannot be bound.
pub async fn new(settings: Settings, specs: Vec<MetricSpec>) -> Result<()> {
    let spec_names: Vec<String> = specs.iter().map(|spec| spec.name.clone()).collect();

    let listen_address = settings.listen_address;
    let listen_port = settings.listen_port;

    let engine = CollectionEngine::new(&settings, specs)?;

    match engine.connect().await {
        Ok(()) => info!("connected to database"),
        Err(err) => warn!(
            error = %err,
            "initial database connection failed; will retry at scrape time"
        ),
    }

    let engine = Arc::new(engine);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(make_span)
        .on_response(on_response);

    let app = Router::new()
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(trace_layer)
                .layer(Extension(engine.clone())),
        );

    let bind_addr = match listen_address {
        IpAddr::V6(ip) => format!("[{ip}]:{listen_port}"),
        IpAddr::V4(ip) => format!("{ip}:{listen_port}"),
    };

    let listener = TcpListener::bind((listen_address, listen_port))
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

    println!(
        "{} {} - Listening on {bind_addr}\n\nLoaded metric definitions:\n{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        format_list(&spec_names),
    );

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
    {
        error!(error=%e, "server error");
    }

    info!("shutting down");

    engine.close().await;

    Ok(())
}

// Helper to format a list of items with a leading dash and indentation for
// the start up message
fn format_list<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn make_span(request: &Request<Body>) -> Span {
    let method = request.method().as_str();

    let path = request.uri().path();

    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info_span!(
        "http.server.request",
        http.method = method,
        http.route = path,
        http.user_agent = user_agent,
        request_id = request_id,
    )
}

fn on_response<B>(response: &axum::http::Response<B>, latency: Duration, span: &Span) {
    info!(
        parent: span,
        status = response.status().as_u16(),
        elapsed_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        "request completed"
    );
}
