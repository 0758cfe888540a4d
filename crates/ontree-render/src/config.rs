//! Diagram settings with JSON overrides.
//!
//! Overrides are partial JSON objects deep-merged onto the defaults, so a file containing only
//! `{"palette": {"matched_collapsed": "orange"}}` changes that one color and nothing else.

use crate::Result;
use crate::geom::{Size, size};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Length of every layout transition.
    pub duration_ms: f64,
    /// Translation applied per pan step while dragging near an edge.
    pub pan_speed: f64,
    /// Distance from a viewport edge that starts edge panning.
    pub pan_boundary: f64,
    pub pan_interval_ms: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Breadth given to each node of the widest level.
    pub px_per_level: f64,
    /// Depth spacing per character of the longest label.
    pub label_char_width: f64,
    pub base_radius: f64,
    pub max_radius: f64,
    /// Radius of the invisible drop target around each node.
    pub ghost_radius: f64,
    pub label_offset: f64,
    pub palette: Palette,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            viewport_width: 960.0,
            viewport_height: 800.0,
            duration_ms: 750.0,
            pan_speed: 200.0,
            pan_boundary: 20.0,
            pan_interval_ms: 50.0,
            min_zoom: 0.1,
            max_zoom: 3.0,
            px_per_level: 25.0,
            label_char_width: 10.0,
            base_radius: 4.5,
            max_radius: 20.0,
            ghost_radius: 30.0,
            label_offset: 10.0,
            palette: Palette::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub matched_collapsed: String,
    pub matched_expanded: String,
    pub unmatched_collapsed: String,
    pub background: String,
    pub node_stroke: String,
    pub link: String,
    pub temp_link: String,
    pub text: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            matched_collapsed: "goldenrod".to_string(),
            matched_expanded: "gold".to_string(),
            unmatched_collapsed: "lightsteelblue".to_string(),
            background: "#fff".to_string(),
            node_stroke: "steelblue".to_string(),
            link: "#ccc".to_string(),
            temp_link: "red".to_string(),
            text: "black".to_string(),
        }
    }
}

impl DiagramConfig {
    /// Defaults with a JSON override document merged on top.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let overrides: Value = serde_json::from_str(text)?;
        Self::default().merged(&overrides)
    }

    /// Returns a copy with `overrides` deep-merged onto it. Unknown keys are ignored.
    pub fn merged(&self, overrides: &Value) -> Result<Self> {
        let mut base = serde_json::to_value(self)?;
        deep_merge_value(&mut base, overrides);
        Ok(serde_json::from_value(base)?)
    }

    pub fn viewport(&self) -> Size {
        size(self.viewport_width, self.viewport_height)
    }

    pub fn clamp_zoom(&self, scale: f64) -> f64 {
        scale.clamp(self.min_zoom, self.max_zoom)
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}
