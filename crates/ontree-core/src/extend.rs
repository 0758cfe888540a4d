//! Copies table columns onto matching ontology nodes.

use crate::aggregate::MatchKey;
use crate::ontology::{CHILDREN_KEY, NAME_KEY, Ontology};
use crate::table::Table;
use crate::Result;
use rustc_hash::FxHashMap;
use serde_json::{Number, Value};

/// Writes every column of the first row whose `key.data_field` equals the node's
/// `key.node_field` into that node's attributes. The join column itself, `name` and `children`
/// are never written. Returns the number of nodes that received data.
pub fn merge_table(ontology: &mut Ontology, table: &Table, key: &MatchKey) -> Result<usize> {
    let key_col = table.require_column(&key.data_field)?;

    let mut first_row: FxHashMap<&str, usize> = FxHashMap::default();
    for (idx, row) in table.rows().iter().enumerate() {
        first_row.entry(table.field(row, key_col)).or_insert(idx);
    }

    let columns: Vec<(usize, &str)> = table
        .headers()
        .iter()
        .enumerate()
        .filter(|(idx, h)| {
            *idx != key_col && h.as_str() != NAME_KEY && h.as_str() != CHILDREN_KEY
        })
        .map(|(idx, h)| (idx, h.as_str()))
        .collect();

    let mut merged = 0;
    for id in ontology.preorder() {
        let Some(row_idx) = ontology[id]
            .key(&key.node_field)
            .and_then(|k| first_row.get(k.as_ref()).copied())
        else {
            continue;
        };
        let row = &table.rows()[row_idx];
        let Some(node) = ontology.get_mut(id) else {
            continue;
        };
        for &(col, header) in &columns {
            node.attributes_mut()
                .insert(header.to_string(), cell_value(table.field(row, col)));
        }
        merged += 1;
    }

    tracing::debug!(merged, rows = table.len(), "merged table into ontology");
    Ok(merged)
}

/// Integers and finite floats become JSON numbers, blank cells become `null`.
fn cell_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}
