//! Pure translation of tabular query results into labeled metric samples.
//! No I/O and no shared state: mapping the same `(spec, rows)` twice yields
//! identical output.

use crate::collector::NAMESPACE;
use crate::collector::row::{CellValue, ResultRow};
use crate::collector::spec::{MetricKind, MetricSpec};
use std::collections::HashMap;
use tracing::debug;

/// One concrete observation: label values aligned with the family's label
/// names, plus the numeric value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub label_values: Vec<String>,
    pub value: f64,
}

/// A named group of samples sharing name, help, kind and label schema.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub full_name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
    pub samples: Vec<MetricSample>,
}

impl MetricFamily {
    /// A single-sample family with no labels, used for status metrics.
    #[must_use]
    pub fn status(full_name: &str, help: &str, value: f64) -> Self {
        Self {
            full_name: full_name.to_string(),
            help: help.to_string(),
            kind: MetricKind::Gauge,
            label_names: Vec::new(),
            samples: vec![MetricSample {
                label_values: Vec::new(),
                value,
            }],
        }
    }
}

/// Convert one spec's result rows into metric families.
///
/// Per row: label values are extracted case-insensitively (missing columns
/// become empty strings, never an error), every non-label numeric column
/// becomes a sample under `tibero_<spec>_<value_name>`, and families are
/// created lazily keyed by full name with the first sample fixing the
/// family's schema for this scrape.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn map(spec: &MetricSpec, rows: &[ResultRow]) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let label_values: Vec<String> = spec
            .labels
            .iter()
            .map(|label| row.get(label).map(CellValue::as_label).unwrap_or_default())
            .collect();

        for (column, cell) in row.iter() {
            if spec.is_label_column(column) {
                continue;
            }
            if !cell.is_numeric() {
                continue;
            }
            let Some(value) = cell.as_f64() else {
                debug!(metric = %spec.name, column, "value did not coerce to a number, skipping cell");
                continue;
            };
            if spec.ignore_zero && value == 0.0 {
                continue;
            }

            let value_name = spec.value_name_for(column);
            let full_name = format!("{NAMESPACE}_{}_{value_name}", spec.name);

            let slot = *index.entry(full_name.clone()).or_insert_with(|| {
                families.push(MetricFamily {
                    full_name,
                    help: spec.help.clone(),
                    kind: spec.kind,
                    label_names: spec.labels.clone(),
                    samples: Vec::new(),
                });
                families.len() - 1
            });

            if let Some(family) = families.get_mut(slot) {
                family.samples.push(MetricSample {
                    label_values: label_values.clone(),
                    value,
                });
            }
        }
    }

    families
}
