use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::DeviceSize;

// Tuning constants shared by the layout engines. The values are load-bearing:
// several downstream renderers assume the exact spacing rhythm they produce.

/// Sibling spacing used by the rank-based engines.
pub const DEFAULT_NODE_SPACING: f32 = 250.0;
/// Distance between layers in the hierarchical engine.
pub const DEFAULT_LAYER_SPACING: f32 = 400.0;
/// In-cell padding for the bento engine.
pub const DEFAULT_MODULE_PADDING: f32 = 80.0;
/// Padding added around member extents when boxing a module.
pub const MODULE_BOUNDS_PADDING: f32 = 40.0;

pub const DEFAULT_NODE_WIDTH: f32 = 80.0;
pub const DEFAULT_NODE_HEIGHT: f32 = 60.0;

/// Vertical offset applied to the first layer.
pub const LAYER_Y_OFFSET: f32 = 100.0;
/// Layers holding more than this many nodes get compressed sibling spacing.
pub const DENSE_LAYER_THRESHOLD: usize = 4;
pub const DENSE_SPACING_FACTOR: f32 = 0.8;
/// Layers holding more than this many nodes wrap into two rows.
pub const LAYER_ROW_WRAP_THRESHOLD: usize = 6;
pub const WRAPPED_ROW_GAP: f32 = 150.0;
/// Number of forward+backward barycenter sweeps.
pub const BARYCENTER_SWEEPS: usize = 3;
/// Sibling spacing applied when a layer is reordered by barycenter.
pub const BARYCENTER_RESPACING: f32 = 200.0;
/// Ranks for disconnected nodes sit this far below the BFS start level.
pub const DISCONNECTED_RANK_OFFSET: i64 = 2;

/// Upper bound on curve control-point offsets.
pub const MAX_CURVATURE: f32 = 50.0;
/// Horizontal spans below this are routed as purely vertical connections.
pub const ORTHOGONAL_VERTICAL_THRESHOLD: f32 = 50.0;
/// Clearance between a node boundary and its orthogonal exit stub.
pub const ORTHOGONAL_STUB_CLEARANCE: f32 = 20.0;

/// Target aspect ratio for the bento grid search.
pub const GOLDEN_RATIO: f32 = 1.618;
/// Edge length of one bento grid cell.
pub const BENTO_CELL_SIZE: f32 = 300.0;

pub const DEFAULT_LOCATION_SPACING: f32 = 40.0;
pub const DEFAULT_LOCATION_PADDING: f32 = 40.0;
pub const DEFAULT_DEVICE_COLUMNS: usize = 3;
pub const MIN_LOCATION_WIDTH: f32 = 200.0;
pub const MIN_LOCATION_HEIGHT: f32 = 150.0;
pub const LOCATION_NODE_SIZE: f32 = 60.0;
pub const LOCATION_NODE_SPACING: f32 = 60.0;
/// Root locations wrap to a new row past this running width.
pub const MAX_LOCATION_ROW_WIDTH: f32 = 1800.0;
/// Headroom reserved above a location box for its label.
pub const LOCATION_LABEL_HEADROOM: f32 = 30.0;
/// Outer margin added around combined node/group bounds.
pub const BOUNDS_MARGIN: f32 = 50.0;

pub const SUBGRAPH_NODE_WIDTH: f32 = 180.0;
pub const SUBGRAPH_NODE_HEIGHT: f32 = 60.0;
pub const SUBGRAPH_NODE_SPACING: f32 = 30.0;
pub const SUBGRAPH_RANK_SPACING: f32 = 60.0;
pub const SUBGRAPH_PADDING: f32 = 25.0;
pub const SUBGRAPH_LABEL_HEIGHT: f32 = 28.0;
pub const SUBGRAPH_SPACING: f32 = 40.0;
/// Bezier control points sit at this fraction of the inter-anchor distance.
pub const SUBGRAPH_CONTROL_FACTOR: f32 = 0.4;
pub const EMPTY_SUBGRAPH_WIDTH: f32 = 150.0;
pub const EMPTY_SUBGRAPH_HEIGHT: f32 = 80.0;
/// Canvas reported for a subgraph-aware layout with nothing to place.
pub const EMPTY_LAYOUT_WIDTH: f32 = 400.0;
pub const EMPTY_LAYOUT_HEIGHT: f32 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeRouting {
    Straight,
    Curved,
    Orthogonal,
}

impl Default for EdgeRouting {
    fn default() -> Self {
        Self::Straight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Alignment,
    Distance,
    Order,
    Group,
}

/// Reserved for constraint-solving engines; current algorithms ignore these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConstraint {
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    #[serde(default)]
    pub nodes: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Caller-facing layout options. Every spacing field is optional; each engine
/// fills in its own defaults, so one options document can drive any engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    pub node_spacing: Option<f32>,
    pub layer_spacing: Option<f32>,
    pub rank_spacing: Option<f32>,
    /// Cell size basis for the location engine's device grid.
    pub node_size: Option<f32>,
    pub module_padding: Option<f32>,
    pub edge_routing: EdgeRouting,
    #[serde(default = "default_true")]
    pub respect_manual_positions: bool,
    pub location_spacing: Option<f32>,
    pub location_padding: Option<f32>,
    pub device_columns: Option<usize>,
    pub min_location_size: Option<DeviceSize>,
    /// Reserved; current algorithms are deterministic without it.
    pub seed: Option<u64>,
    /// Reserved for constraint-solving engines.
    pub constraints: Vec<LayoutConstraint>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            node_spacing: None,
            layer_spacing: None,
            rank_spacing: None,
            node_size: None,
            module_padding: None,
            edge_routing: EdgeRouting::Straight,
            respect_manual_positions: true,
            location_spacing: None,
            location_padding: None,
            device_columns: None,
            min_location_size: None,
            seed: None,
            constraints: Vec::new(),
        }
    }
}

impl LayoutOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Load options from a JSON or JSON5 file. `None` yields the defaults.
pub fn load_options(path: Option<&Path>) -> anyhow::Result<LayoutOptions> {
    let Some(path) = path else {
        return Ok(LayoutOptions::default());
    };

    let contents = std::fs::read_to_string(path)?;
    let is_json5 = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json5"))
        .unwrap_or(false);

    let options: LayoutOptions = if is_json5 {
        json5::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_parse_with_partial_fields() {
        let options: LayoutOptions = serde_json::from_str(
            r#"{"nodeSpacing": 120, "edgeRouting": "orthogonal", "deviceColumns": 4}"#,
        )
        .unwrap();
        assert_eq!(options.node_spacing, Some(120.0));
        assert_eq!(options.edge_routing, EdgeRouting::Orthogonal);
        assert_eq!(options.device_columns, Some(4));
        assert_eq!(options.layer_spacing, None);
    }

    #[test]
    fn manual_positions_respected_unless_disabled() {
        let parsed: LayoutOptions = serde_json::from_str("{}").unwrap();
        assert!(parsed.respect_manual_positions);
        let disabled: LayoutOptions =
            serde_json::from_str(r#"{"respectManualPositions": false}"#).unwrap();
        assert!(!disabled.respect_manual_positions);
    }
}
