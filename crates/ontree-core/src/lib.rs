#![forbid(unsafe_code)]

//! Ontology tree model and match-statistics aggregation (headless).
//!
//! - [`ontology`]: arena-backed tree with explicit expanded/collapsed/leaf branches
//! - [`measurement`]: match-result rows keyed for joining onto nodes
//! - [`aggregate`]: bottom-up statistics and the initial expand/collapse policy
//! - [`load`]: executor-agnostic async loading of both inputs
//! - [`convert`], [`extend`], [`counts`]: data preparation helpers around the tree

pub mod aggregate;
pub mod convert;
pub mod counts;
pub mod error;
pub mod extend;
pub mod load;
pub mod measurement;
pub mod ontology;
pub mod table;

pub use aggregate::{MatchKey, Stats, aggregate, annotate, apply_initial_visibility};
pub use error::{Error, Result};
pub use load::{FileSource, InlineSource, LoadOptions, LoadedTree, TextSource, load_tree};
pub use measurement::{MeasurementRow, MeasurementTable};
pub use ontology::{Branch, NodeId, Ontology, OntologyNode};
pub use table::Table;

#[cfg(test)]
mod tests;
