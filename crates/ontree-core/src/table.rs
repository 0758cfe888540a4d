//! Delimited text tables (TSV/CSV) with a header row.

use crate::{Error, Result};
use std::path::Path;

pub const TAB: u8 = b'\t';
pub const COMMA: u8 = b',';

/// Picks `,` for `.csv` files and tab for everything else.
pub fn delimiter_for_path(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => COMMA,
        _ => TAB,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// 1-based line number in the source text.
    pub line: u64,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<TableRow>,
}

impl Table {
    pub fn parse(text: &str, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            rows.push(TableRow {
                line,
                fields: record.iter().map(str::to_string).collect(),
            });
        }

        tracing::debug!(columns = headers.len(), rows = rows.len(), "parsed table");
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
        })
    }

    /// Field of `row` in column `col`; short rows read as empty.
    pub fn field<'a>(&self, row: &'a TableRow, col: usize) -> &'a str {
        row.fields.get(col).map(String::as_str).unwrap_or("")
    }
}
