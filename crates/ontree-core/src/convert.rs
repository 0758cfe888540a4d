//! Conversion of flat ClassyFire term lists into a nested ontology.
//!
//! The input is a JSON array of `{chemont_id, name, parent_chemont_id}` records. Exactly one
//! term has no parent (`null` or the string `"null"`) and becomes the root; every other term
//! must reference a known parent. Children carry their term id as an `id` attribute.

use crate::ontology::{CHILDREN_KEY, NAME_KEY, Ontology};
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
struct ClassyFireTerm {
    chemont_id: String,
    name: String,
    #[serde(default)]
    parent_chemont_id: Option<String>,
}

impl ClassyFireTerm {
    fn parent(&self) -> Option<&str> {
        match self.parent_chemont_id.as_deref() {
            None | Some("null") | Some("") => None,
            Some(id) => Some(id),
        }
    }
}

pub fn classyfire_to_ontology(text: &str) -> Result<Ontology> {
    let terms: Vec<ClassyFireTerm> = serde_json::from_str(text)?;

    let mut by_id: IndexMap<&str, usize> = IndexMap::with_capacity(terms.len());
    for (idx, term) in terms.iter().enumerate() {
        if by_id.insert(term.chemont_id.as_str(), idx).is_some() {
            return Err(conversion(format!("duplicate term id `{}`", term.chemont_id)));
        }
    }

    let mut root: Option<usize> = None;
    let mut children: IndexMap<usize, Vec<usize>> = IndexMap::new();
    for (idx, term) in terms.iter().enumerate() {
        match term.parent() {
            None => {
                if let Some(prev) = root {
                    return Err(conversion(format!(
                        "multiple root terms: `{}` and `{}`",
                        terms[prev].chemont_id, term.chemont_id
                    )));
                }
                root = Some(idx);
            }
            Some(parent_id) => {
                let Some(&parent) = by_id.get(parent_id) else {
                    return Err(conversion(format!(
                        "term `{}` references unknown parent `{parent_id}`",
                        term.chemont_id
                    )));
                };
                children.entry(parent).or_default().push(idx);
            }
        }
    }
    let Some(root) = root else {
        return Err(conversion("no root term (parent_chemont_id = null)".to_string()));
    };

    let mut reached = 0usize;
    let value = term_value(&terms, &children, root, &mut reached);
    if reached != terms.len() {
        return Err(conversion(format!(
            "{} term(s) are not reachable from the root (cyclic parent links)",
            terms.len() - reached
        )));
    }

    tracing::debug!(terms = terms.len(), "converted ClassyFire terms");
    Ontology::from_value(&value)
}

fn term_value(
    terms: &[ClassyFireTerm],
    children: &IndexMap<usize, Vec<usize>>,
    idx: usize,
    reached: &mut usize,
) -> Value {
    *reached += 1;
    let term = &terms[idx];
    let mut obj = Map::new();
    obj.insert(NAME_KEY.to_string(), Value::String(term.name.clone()));
    obj.insert("id".to_string(), Value::String(term.chemont_id.clone()));
    if let Some(kids) = children.get(&idx) {
        obj.insert(
            CHILDREN_KEY.to_string(),
            Value::Array(
                kids.iter()
                    .map(|&k| term_value(terms, children, k, reached))
                    .collect(),
            ),
        );
    }
    Value::Object(obj)
}

fn conversion(message: String) -> Error {
    Error::Conversion { message }
}
