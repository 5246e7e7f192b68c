use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::time::Duration;

/// Metric kind exposed to the exposition format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetricKind {
    #[default]
    Gauge,
    Counter,
}

impl MetricKind {
    /// Lenient parse matching the original definitions: anything other than
    /// `counter` (any case) is a gauge.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("counter") {
            Self::Counter
        } else {
            Self::Gauge
        }
    }
}

fn deserialize_kind<'de, D>(deserializer: D) -> Result<MetricKind, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(MetricKind::parse(&value))
}

/// One metric definition as loaded from a YAML metrics file.
///
/// Immutable once loaded; the engine owns the loaded set for the process
/// lifetime. Column references (`labels`, `fieldtoname` keys) match result
/// columns case-insensitively.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricSpec {
    #[serde(default)]
    pub name: String,

    /// Informational group the metric belongs to.
    #[serde(default)]
    pub context: String,

    #[serde(default)]
    pub help: String,

    /// SQL text executed for this metric.
    #[serde(default, rename = "request")]
    pub query: String,

    /// Result columns exported as label values, in label order.
    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default, rename = "metrictype", deserialize_with = "deserialize_kind")]
    pub kind: MetricKind,

    /// Maps a result column to its exported value-name suffix; columns
    /// without an entry use their lower-cased name.
    #[serde(default, rename = "fieldtoname")]
    pub field_to_name: HashMap<String, String>,

    /// Suppress zero-valued samples (and empty result sets) entirely.
    #[serde(default, rename = "ignorezeroresult")]
    pub ignore_zero: bool,

    /// Per-metric query timeout in seconds; 0 inherits the process default.
    #[serde(default, rename = "querytimeout")]
    pub query_timeout: u64,
}

impl MetricSpec {
    #[must_use]
    pub fn is_label_column(&self, column: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(column))
    }

    /// Exported value-name for a result column: the `fieldtoname` mapping if
    /// one matches (case-insensitive), otherwise the lower-cased column name.
    #[must_use]
    pub fn value_name_for(&self, column: &str) -> String {
        self.field_to_name
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(column))
            .map_or_else(|| column.to_ascii_lowercase(), |(_, name)| name.clone())
    }

    /// Metric-specific timeout if one is set, else the process default.
    #[must_use]
    pub fn resolve_timeout(&self, default: Duration) -> Duration {
        if self.query_timeout > 0 {
            Duration::from_secs(self.query_timeout)
        } else {
            default
        }
    }
}
