//! Tabular form of a query result: each row maps lower-cased column names to
//! a small closed value variant, preserving select-list order so that mapping
//! the same rows twice yields the same samples in the same order.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::debug;

/// Matches integer or decimal literals, e.g. `42`, `-7`, `3.14`.
#[allow(clippy::unwrap_used)]
static NUMERIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap());

/// A single result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Whether the cell can contribute a metric value: a native number, or a
    /// string that looks like one.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Number(_) => true,
            Self::Text(text) => NUMERIC_PATTERN.is_match(text),
            Self::Null => false,
        }
    }

    /// Coerce to a 64-bit float. `None` when the cell is null or the text
    /// does not parse.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.parse().ok(),
            Self::Null => None,
        }
    }

    /// Render the cell as a label value; nulls become the empty string.
    #[must_use]
    pub fn as_label(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Number(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// One materialized result row with lower-cased column names in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    cells: Vec<(String, CellValue)>,
}

impl ResultRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell; the column name is lower-cased on insertion.
    pub fn push(&mut self, column: &str, value: CellValue) {
        self.cells.push((column.to_ascii_lowercase(), value));
    }

    /// Case-insensitive column lookup.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<(String, CellValue)> for ResultRow {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (column, value) in iter {
            row.push(&column, value);
        }
        row
    }
}

/// Materialize a driver row into the uniform tabular form.
pub(crate) fn from_pg_row(row: &PgRow) -> ResultRow {
    let mut result = ResultRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        result.push(column.name(), decode_cell(row, idx, column.type_info().name()));
    }
    result
}

#[allow(clippy::cast_precision_loss)]
fn i64_to_f64(value: i64) -> f64 {
    value as f64
}

/// Decode one cell into the closed variant. Types outside the recognized set
/// fall back to their text form; anything undecodable becomes null.
fn decode_cell(row: &PgRow, idx: usize, type_name: &str) -> CellValue {
    let is_null = row
        .try_get_raw(idx)
        .map(|raw| raw.is_null())
        .unwrap_or(true);
    if is_null {
        return CellValue::Null;
    }

    let decoded = match type_name {
        "INT2" => row.try_get::<i16, _>(idx).ok().map(|v| CellValue::Number(f64::from(v))),
        "INT4" => row.try_get::<i32, _>(idx).ok().map(|v| CellValue::Number(f64::from(v))),
        "INT8" => row
            .try_get::<i64, _>(idx)
            .ok()
            .map(|v| CellValue::Number(i64_to_f64(v))),
        "FLOAT4" => row.try_get::<f32, _>(idx).ok().map(|v| CellValue::Number(f64::from(v))),
        "FLOAT8" => row.try_get::<f64, _>(idx).ok().map(CellValue::Number),
        "NUMERIC" => row
            .try_get::<sqlx::types::Decimal, _>(idx)
            .ok()
            .and_then(|d| d.to_string().parse().ok())
            .map(CellValue::Number),
        "BOOL" => row
            .try_get::<bool, _>(idx)
            .ok()
            .map(|v| CellValue::Text(v.to_string())),
        _ => row.try_get::<String, _>(idx).ok().map(CellValue::Text),
    };

    decoded.unwrap_or_else(|| {
        debug!(column = idx, r#type = type_name, "cell did not decode, treating as null");
        CellValue::Null
    })
}
