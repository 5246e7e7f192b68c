use crate::collector::CollectionEngine;
use crate::exporter::GIT_COMMIT_HASH;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

// Create health struct based on database status
fn create_health_response(database_ok: bool) -> Health {
    Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_ok {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    }
}

// Create response body based on method
fn create_response_body(method: &Method, health: &Health) -> Body {
    if *method == Method::GET {
        Json(health).into_response().into_body()
    } else {
        Body::empty()
    }
}

// Create X-App header
fn create_app_headers(health: &Health) -> HeaderMap {
    let short_hash = health.commit.get(0..7).unwrap_or("");

    let header_value = format!("{}:{}:{}", health.name, health.version, short_hash);

    match header_value.parse::<HeaderValue>() {
        Ok(x_app_header_value) => {
            debug!("X-App header: {:?}", x_app_header_value);
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        }
        Err(err) => {
            debug!("Failed to parse X-App header: {err}");
            HeaderMap::new()
        }
    }
}

// Main axum handler for health
pub async fn health(
    method: Method,
    engine: Extension<Arc<CollectionEngine>>,
) -> impl IntoResponse {
    let database_ok = engine.is_healthy().await;
    let health = create_health_response(database_ok);
    let body = create_response_body(&method, &health);
    let headers = create_app_headers(&health);

    if database_ok {
        debug!("database connection is healthy");
        (StatusCode::OK, headers, body)
    } else {
        debug!("database connection is unhealthy");
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_reports_database_state() {
        let ok = create_health_response(true);
        assert_eq!(ok.database, "ok");
        assert_eq!(ok.name, env!("CARGO_PKG_NAME"));
        assert_eq!(ok.version, env!("CARGO_PKG_VERSION"));

        let err = create_health_response(false);
        assert_eq!(err.database, "error");
    }

    #[test]
    fn test_app_headers_contain_name_and_version() {
        let health = create_health_response(true);
        let headers = create_app_headers(&health);

        let value = headers
            .get("X-App")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        assert!(value.starts_with(env!("CARGO_PKG_NAME")));
        assert!(value.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_options_body_is_empty() {
        let health = create_health_response(true);
        let body = create_response_body(&Method::OPTIONS, &health);

        // OPTIONS gets headers only; the JSON body is reserved for GET.
        drop(body);
    }
}
