use crate::collector::{CollectionEngine, ScrapeResult, mapper::MetricFamily, spec::MetricKind};
use anyhow::Result;
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use prometheus::{Encoder, TextEncoder, proto};
use std::sync::Arc;
use tracing::{debug, error};

pub async fn metrics(Extension(engine): Extension<Arc<CollectionEngine>>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        "content-type",
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );

    let result = engine.collect().await;

    match encode(&result) {
        Ok(body) => {
            debug!(families = result.families.len(), "rendered scrape result");
            (StatusCode::OK, headers, body)
        }
        Err(e) => {
            error!("failed to encode metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                headers,
                format!("Error encoding metrics: {e}"),
            )
        }
    }
}

/// Render a scrape result in the Prometheus text exposition format.
fn encode(result: &ScrapeResult) -> Result<String> {
    let families: Vec<proto::MetricFamily> = result.families.iter().map(to_proto).collect();

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}

fn to_proto(family: &MetricFamily) -> proto::MetricFamily {
    let mut proto_family = proto::MetricFamily::default();
    proto_family.set_name(family.full_name.clone());
    proto_family.set_help(family.help.clone());
    proto_family.set_field_type(match family.kind {
        MetricKind::Gauge => proto::MetricType::GAUGE,
        MetricKind::Counter => proto::MetricType::COUNTER,
    });

    for sample in &family.samples {
        let mut metric = proto::Metric::default();

        for (name, value) in family.label_names.iter().zip(&sample.label_values) {
            let mut pair = proto::LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            metric.label.push(pair);
        }

        match family.kind {
            MetricKind::Gauge => {
                let mut gauge = proto::Gauge::default();
                gauge.set_value(sample.value);
                metric.set_gauge(gauge);
            }
            MetricKind::Counter => {
                let mut counter = proto::Counter::default();
                counter.set_value(sample.value);
                metric.set_counter(counter);
            }
        }

        proto_family.mut_metric().push(metric);
    }

    proto_family
}
