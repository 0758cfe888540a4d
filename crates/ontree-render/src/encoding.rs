//! Visual encoding of match statistics: node radius, fill, label placement and tooltip text.

use crate::config::DiagramConfig;
use crate::reconcile::LinkPath;
use ontree_core::{OntologyNode, Stats};
use std::fmt::Write as _;

pub fn node_radius(stats: &Stats, config: &DiagramConfig) -> f64 {
    if stats.matched_count > 0.0 {
        (config.base_radius + stats.matched_count.sqrt()).min(config.max_radius)
    } else {
        config.base_radius
    }
}

/// Matched nodes are highlighted, strongly when their children are hidden. Unmatched nodes are
/// tinted only when collapsed.
pub fn node_fill<'a>(node: &OntologyNode, config: &'a DiagramConfig) -> &'a str {
    let palette = &config.palette;
    let collapsed = node.branch().is_collapsed();
    match (node.stats().has_matches(), collapsed) {
        (true, true) => palette.matched_collapsed.as_str(),
        (true, false) => palette.matched_expanded.as_str(),
        (false, true) => palette.unmatched_collapsed.as_str(),
        (false, false) => palette.background.as_str(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    End,
}

impl TextAnchor {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    pub x: f64,
    pub anchor: TextAnchor,
}

/// Labels of nodes with children (shown or hidden) sit left of the circle, leaf labels right.
pub fn label_placement(node: &OntologyNode, config: &DiagramConfig) -> LabelPlacement {
    if node.has_children() {
        LabelPlacement {
            x: -config.label_offset,
            anchor: TextAnchor::End,
        }
    } else {
        LabelPlacement {
            x: config.label_offset,
            anchor: TextAnchor::Start,
        }
    }
}

pub fn tooltip_lines(node: &OntologyNode) -> Vec<String> {
    let stats = node.stats();
    let mut lines = vec![format!("Name: {}", node.name())];
    if stats.matched_count > 0.0 {
        lines.push(format!("Matches: {}", js_number(stats.matched_count)));
    }
    if stats.occurrence_fraction > 0.0 {
        lines.push(format!(
            "Occurrence fraction: {}",
            js_number(stats.occurrence_fraction)
        ));
    }
    if stats.group_size > 0.0 {
        lines.push(format!("Group size: {}", js_number(stats.group_size)));
    }
    lines
}

/// Horizontal cubic Bézier from source to target with both control points at mid-depth.
pub fn diagonal_path(link: &LinkPath) -> String {
    let (s, t) = (link.source, link.target);
    let mx = (s.x + t.x) / 2.0;
    let mut out = String::new();
    let _ = write!(
        &mut out,
        "M{},{}C{},{} {},{} {},{}",
        js_number(s.x),
        js_number(s.y),
        js_number(mx),
        js_number(s.y),
        js_number(mx),
        js_number(t.y),
        js_number(t.x),
        js_number(t.y)
    );
    out
}

/// Shortest round-trip decimal, printed the way a browser prints numbers.
pub fn js_number(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let v = if v == 0.0 { 0.0 } else { v };
    ryu_js::Buffer::new().format_finite(v).to_string()
}
