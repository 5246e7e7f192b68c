//! Loads metric definitions from YAML files. Resolution is soft: an external
//! file wins, the embedded copy of the default definitions backs it up, and
//! a path absent in both forms yields a diagnostic plus an empty list rather
//! than an error.

use crate::collector::config::Settings;
use crate::collector::spec::MetricSpec;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// File name of the definitions compiled into the binary.
pub const DEFAULT_METRICS_RESOURCE: &str = "default_metrics.yaml";

static EMBEDDED_DEFAULT_METRICS: &str = include_str!("../../default_metrics.yaml");

#[derive(Debug, Deserialize)]
struct MetricsFile {
    #[serde(default)]
    metrics: Option<Vec<MetricSpec>>,
}

/// Load metric definitions from `path`, falling back to the embedded
/// resource when the path's file name matches it. Returns an empty list when
/// the file is absent in both forms or does not parse.
#[must_use]
pub fn load_specs(path: &str) -> Vec<MetricSpec> {
    if Path::new(path).exists() {
        match fs::read_to_string(path) {
            Ok(source) => {
                info!(path, "loading metrics from external file");
                return parse_specs(&source, path);
            }
            Err(err) => {
                error!(path, error = %err, "error reading metrics file");
                return Vec::new();
            }
        }
    }

    if file_name(path) == Some(DEFAULT_METRICS_RESOURCE) {
        info!(path, "loading metrics from embedded resource");
        return parse_specs(EMBEDDED_DEFAULT_METRICS, path);
    }

    warn!(path, "metrics file not found (external or embedded)");
    Vec::new()
}

/// Base definitions merged with the optional custom set by simple
/// concatenation, no de-duplication.
#[must_use]
pub fn load_all(settings: &Settings) -> Vec<MetricSpec> {
    let mut specs = load_specs(&settings.metrics_file);
    info!(
        count = specs.len(),
        path = %settings.metrics_file,
        "loaded metric definitions"
    );

    if let Some(custom) = &settings.custom_metrics_file {
        if !custom.is_empty() {
            let custom_specs = load_specs(custom);
            info!(count = custom_specs.len(), path = %custom, "loaded custom metric definitions");
            specs.extend(custom_specs);
        }
    }

    specs
}

/// Whether `path` resolves to something loadable, externally or embedded.
/// Backs configuration validation.
#[must_use]
pub fn is_metrics_file_available(path: &str) -> bool {
    Path::new(path).exists() || file_name(path) == Some(DEFAULT_METRICS_RESOURCE)
}

fn file_name(path: &str) -> Option<&str> {
    Path::new(path).file_name().and_then(|name| name.to_str())
}

fn parse_specs(source: &str, origin: &str) -> Vec<MetricSpec> {
    let file: MetricsFile = match serde_yaml::from_str(source) {
        Ok(file) => file,
        Err(err) => {
            error!(path = origin, error = %err, "error parsing metrics file");
            return Vec::new();
        }
    };

    let Some(metrics) = file.metrics else {
        warn!(path = origin, "no metrics found in file");
        return Vec::new();
    };

    metrics
        .into_iter()
        .filter(|spec| {
            if spec.name.is_empty() || spec.query.is_empty() {
                warn!(
                    path = origin,
                    name = %spec.name,
                    "dropping metric definition with empty name or query"
                );
                false
            } else {
                true
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_defaults_parse() {
        let specs = parse_specs(EMBEDDED_DEFAULT_METRICS, DEFAULT_METRICS_RESOURCE);

        assert!(!specs.is_empty());
        assert!(specs.iter().all(|s| !s.name.is_empty() && !s.query.is_empty()));
        assert!(specs.iter().any(|s| s.name == "sessions"));
    }

    #[test]
    fn test_default_resource_loads_without_external_file() {
        let specs = load_specs("default_metrics.yaml");
        assert!(!specs.is_empty());

        // A relative or absolute prefix still resolves to the embedded copy.
        let specs = load_specs("/nonexistent/dir/default_metrics.yaml");
        assert!(!specs.is_empty());
    }

    #[test]
    fn test_missing_file_yields_empty_list() {
        assert!(load_specs("/nonexistent/custom_metrics.yaml").is_empty());
        assert!(!is_metrics_file_available("/nonexistent/custom_metrics.yaml"));
        assert!(is_metrics_file_available("anywhere/default_metrics.yaml"));
    }

    #[test]
    fn test_external_file_wins() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "metrics:\n  - name: custom\n    request: SELECT 1 FROM DUAL"
        )
        .expect("write");

        let specs = load_specs(file.path().to_str().expect("utf-8 path"));

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "custom");
    }

    #[test]
    fn test_invalid_entries_are_dropped() {
        let specs = parse_specs(
            "metrics:\n  - name: ok\n    request: SELECT 1\n  - name: ''\n    request: SELECT 2\n  - name: noquery\n",
            "test",
        );

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "ok");
    }

    #[test]
    fn test_empty_metrics_key_is_not_an_error() {
        assert!(parse_specs("metrics:", "test").is_empty());
        assert!(parse_specs("other: 1", "test").is_empty());
    }

    #[test]
    fn test_merge_concatenates_without_dedup() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "metrics:\n  - name: sessions\n    request: SELECT 1 FROM DUAL"
        )
        .expect("write");

        let settings = Settings {
            custom_metrics_file: Some(
                file.path().to_str().expect("utf-8 path").to_string(),
            ),
            ..Settings::default()
        };
        let specs = load_all(&settings);

        // The custom "sessions" does not replace the default one.
        assert!(specs.iter().filter(|s| s.name == "sessions").count() >= 2);
    }
}
