//! Bottom-up aggregation of match statistics and the initial expand/collapse policy.

use crate::measurement::{GROUP_VALUE, MeasurementRow, MeasurementTable};
use crate::ontology::{NAME_KEY, Ontology};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Summed match statistics of a node and everything below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub matched_count: f64,
    pub group_size: f64,
    pub occurrence_fraction: f64,
}

impl Stats {
    pub fn new(matched_count: f64, group_size: f64, occurrence_fraction: f64) -> Self {
        Self {
            matched_count,
            group_size,
            occurrence_fraction,
        }
    }

    pub fn has_matches(&self) -> bool {
        self.matched_count > 0.0
    }
}

impl From<&MeasurementRow> for Stats {
    fn from(row: &MeasurementRow) -> Self {
        Self::new(row.matched_size, row.group_size, row.occurrence_fraction)
    }
}

impl Add for Stats {
    type Output = Stats;

    fn add(self, rhs: Stats) -> Stats {
        Stats {
            matched_count: self.matched_count + rhs.matched_count,
            group_size: self.group_size + rhs.group_size,
            occurrence_fraction: self.occurrence_fraction + rhs.occurrence_fraction,
        }
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Stats) {
        *self = *self + rhs;
    }
}

impl Sum for Stats {
    fn sum<I: Iterator<Item = Stats>>(iter: I) -> Stats {
        iter.fold(Stats::default(), Add::add)
    }
}

/// How ontology nodes are joined against measurement rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchKey {
    /// `name`, or the attribute of the ontology node holding the join value.
    pub node_field: String,
    /// Column of the measurement table holding the join value.
    pub data_field: String,
}

impl Default for MatchKey {
    fn default() -> Self {
        Self {
            node_field: NAME_KEY.to_string(),
            data_field: GROUP_VALUE.to_string(),
        }
    }
}

/// Writes aggregated [`Stats`] onto every node and returns the root's total.
///
/// Each node receives its own matched row (if any) plus the totals of all of its children,
/// hidden ones included, so collapsing a subtree never changes what an ancestor reports.
pub fn aggregate(ontology: &mut Ontology, table: &MeasurementTable, key: &MatchKey) -> Stats {
    let order = ontology.preorder();
    let mut matched_keys: FxHashSet<&str> = FxHashSet::default();

    // Reverse pre-order visits every child before its parent.
    for &id in order.iter().rev() {
        let node = &ontology[id];
        let own = node
            .key(&key.node_field)
            .and_then(|k| table.get(&k))
            .map(|row| {
                matched_keys.insert(row.group_value.as_str());
                Stats::from(row)
            })
            .unwrap_or_default();
        let children: Stats = node
            .branch()
            .all_children()
            .iter()
            .map(|&c| ontology[c].stats())
            .sum();
        if let Some(node) = ontology.get_mut(id) {
            node.set_stats(own + children);
        }
    }

    let unmatched = table.keys().filter(|k| !matched_keys.contains(k)).count();
    let total = ontology[ontology.root()].stats();
    tracing::debug!(
        nodes = order.len(),
        rows = table.len(),
        matched_rows = matched_keys.len(),
        unmatched_rows = unmatched,
        matched = total.matched_count,
        "aggregated match statistics"
    );
    total
}

/// Expands every node with matches below it and collapses the rest. Leaves are untouched.
pub fn apply_initial_visibility(ontology: &mut Ontology) {
    for id in ontology.preorder() {
        if let Some(node) = ontology.get_mut(id) {
            let expanded = node.stats().has_matches();
            node.set_expanded(expanded);
        }
    }
}

/// [`aggregate`] followed by [`apply_initial_visibility`].
pub fn annotate(ontology: &mut Ontology, table: &MeasurementTable, key: &MatchKey) -> Stats {
    let total = aggregate(ontology, table, key);
    apply_initial_visibility(ontology);
    total
}
