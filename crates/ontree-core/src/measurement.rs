//! Match-result rows joined onto ontology nodes.

use crate::table::{TAB, Table, TableRow};
use crate::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const GROUP_VALUE: &str = "group_value";
pub const GROUP_SIZE: &str = "group_size";
pub const MATCHED_SIZE: &str = "matched_size";
pub const OCCURRENCE_FRACTION: &str = "occurrence_fraction";
pub const METADATA_COLUMN: &str = "metadata_column";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    pub group_value: String,
    pub group_size: f64,
    pub matched_size: f64,
    pub occurrence_fraction: f64,
    pub metadata_column: String,
}

/// Measurement rows indexed by their join key. When a key repeats, the first row wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementTable {
    rows: Vec<MeasurementRow>,
    index: IndexMap<String, usize>,
}

impl MeasurementTable {
    pub fn from_rows(rows: Vec<MeasurementRow>) -> Self {
        let mut index = IndexMap::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            index.entry(row.group_value.clone()).or_insert(idx);
        }
        if index.len() != rows.len() {
            tracing::debug!(
                duplicates = rows.len() - index.len(),
                "measurement rows with repeated keys are shadowed by the first occurrence"
            );
        }
        Self { rows, index }
    }

    /// Parses a tab-separated results file keyed by `group_value`.
    pub fn parse_tsv(text: &str) -> Result<Self> {
        Self::parse(text, TAB, GROUP_VALUE)
    }

    /// Parses a delimited results file, reading the join key from `key_column`.
    ///
    /// Numeric columns are coerced: blank cells read as 0, anything else must parse as a
    /// number. Missing numeric or metadata columns read as 0 / empty.
    pub fn parse(text: &str, delimiter: u8, key_column: &str) -> Result<Self> {
        let table = Table::parse(text, delimiter)?;
        Self::from_table(&table, key_column)
    }

    pub fn from_table(table: &Table, key_column: &str) -> Result<Self> {
        let key = table.require_column(key_column)?;
        let group_size = table.column(GROUP_SIZE);
        let matched_size = table.column(MATCHED_SIZE);
        let occurrence_fraction = table.column(OCCURRENCE_FRACTION);
        let metadata = table.column(METADATA_COLUMN);

        let mut rows = Vec::with_capacity(table.len());
        for row in table.rows() {
            rows.push(MeasurementRow {
                group_value: table.field(row, key).to_string(),
                group_size: number(table, row, group_size, GROUP_SIZE),
                matched_size: number(table, row, matched_size, MATCHED_SIZE),
                occurrence_fraction: number(
                    table,
                    row,
                    occurrence_fraction,
                    OCCURRENCE_FRACTION,
                ),
                metadata_column: metadata
                    .map(|col| table.field(row, col).to_string())
                    .unwrap_or_default(),
            });
        }
        Ok(Self::from_rows(rows))
    }

    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&MeasurementRow> {
        self.index.get(key).map(|&idx| &self.rows[idx])
    }

    /// Distinct join keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }
}

/// Blank, non-numeric and non-finite cells read as 0.
fn number(table: &Table, row: &TableRow, col: Option<usize>, column: &str) -> f64 {
    let Some(col) = col else {
        return 0.0;
    };
    let raw = table.field(row, col).trim();
    if raw.is_empty() {
        return 0.0;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            tracing::warn!(
                line = row.line,
                column,
                value = raw,
                "non-numeric measurement cell read as 0"
            );
            0.0
        }
    }
}
