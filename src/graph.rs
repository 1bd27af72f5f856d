use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Primary layout axis for rank-based engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "TB")]
    TopBottom,
    #[serde(rename = "BT")]
    BottomTop,
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" => Some(Self::TopBottom),
            "BT" => Some(Self::BottomTop),
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::TopBottom | Self::BottomTop)
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::TopBottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    Router,
    L3Switch,
    L2Switch,
    Firewall,
    LoadBalancer,
    Server,
    AccessPoint,
    #[serde(rename = "vm")]
    VirtualMachine,
    Container,
    Cloud,
    Internet,
    Unknown,
}

impl Default for DeviceType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Network tier a device belongs to. Layout engines treat roles as placement
/// hints only; identity always comes from the device id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    Core,
    Distribution,
    Access,
    Edge,
    Management,
}

/// One axis of a manual device position: either a fixed pixel value or the
/// literal string `"auto"` in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coord {
    Px(f32),
    Auto(AutoKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoKeyword {
    Auto,
}

impl Coord {
    pub fn value(self) -> Option<f32> {
        match self {
            Self::Px(v) => Some(v),
            Self::Auto(_) => None,
        }
    }
}

impl Default for Coord {
    fn default() -> Self {
        Self::Auto(AutoKeyword::Auto)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicePosition {
    pub x: Coord,
    pub y: Coord,
}

impl DevicePosition {
    /// Both axes fixed, otherwise the position is not usable verbatim.
    pub fn resolved(&self) -> Option<(f32, f32)> {
        Some((self.x.value()?, self.y.value()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: DeviceType,
    #[serde(default)]
    pub role: Option<DeviceRole>,
    #[serde(default)]
    pub position: Option<DevicePosition>,
    #[serde(default)]
    pub size: Option<DeviceSize>,
    /// Subgraph id this device belongs to (subgraph-aware layout).
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEndpoint {
    pub device_id: String,
    #[serde(default)]
    pub port_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub source: LinkEndpoint,
    pub target: LinkEndpoint,
    /// Capacity label, e.g. "10G". Affects stroke weight downstream, never
    /// geometry.
    #[serde(default)]
    pub bandwidth: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpan {
    pub columns: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleLayoutHints {
    pub column: Option<usize>,
    pub row: Option<usize>,
    pub span: Option<ModuleSpan>,
}

/// Named grouping of devices used by the bento engine and module boundary
/// boxes. Nesting via `modules` forms a tree; cycles are rejected upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub layout: Option<ModuleLayoutHints>,
}

/// Recursive grouping consumed by the subgraph-aware hierarchical engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subgraph {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPosition {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
}

/// Physical grouping (building, floor, rack). Forms a tree via `parent_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub device_ids: Vec<String>,
    #[serde(default)]
    pub position: Option<LocationPosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    pub direction: Option<Direction>,
}

/// Declarative description of a network: the sole input to every layout
/// engine. Engines never mutate it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkGraph {
    pub devices: Vec<Device>,
    pub links: Vec<Link>,
    pub modules: Vec<Module>,
    pub subgraphs: Vec<Subgraph>,
    pub locations: Vec<Location>,
    pub settings: GraphSettings,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map of device id to the location that lists it. A device listed by
    /// several locations resolves to the last one, matching document order.
    pub fn device_locations(&self) -> BTreeMap<&str, &str> {
        let mut map = BTreeMap::new();
        for location in &self.locations {
            for device_id in &location.device_ids {
                map.insert(device_id.as_str(), location.id.as_str());
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_accepts_numbers_and_auto() {
        let pos: DevicePosition = serde_json::from_str(r#"{"x": 120.5, "y": "auto"}"#).unwrap();
        assert_eq!(pos.x.value(), Some(120.5));
        assert_eq!(pos.y.value(), None);
        assert!(pos.resolved().is_none());

        let pinned: DevicePosition = serde_json::from_str(r#"{"x": 10, "y": 20}"#).unwrap();
        assert_eq!(pinned.resolved(), Some((10.0, 20.0)));
    }

    #[test]
    fn device_defaults_fill_optional_fields() {
        let device: Device = serde_json::from_str(r#"{"id": "r1", "type": "router"}"#).unwrap();
        assert_eq!(device.kind, DeviceType::Router);
        assert!(device.role.is_none());
        assert!(device.position.is_none());
    }

    #[test]
    fn graph_parses_minimal_document() {
        let graph: NetworkGraph = serde_json::from_str(
            r#"{
                "devices": [
                    {"id": "a", "name": "core-1", "type": "l3-switch", "role": "core"},
                    {"id": "b", "name": "acc-1", "type": "l2-switch", "role": "access"}
                ],
                "links": [
                    {"id": "l1", "source": {"deviceId": "a"}, "target": {"deviceId": "b", "portId": "ge-0/0/1"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(graph.devices.len(), 2);
        assert_eq!(graph.links[0].target.port_id.as_deref(), Some("ge-0/0/1"));
        assert!(graph.locations.is_empty());
    }

    #[test]
    fn device_locations_resolve_last_listing() {
        let mut graph = NetworkGraph::new();
        graph.locations.push(Location {
            id: "dc1".to_string(),
            name: "DC 1".to_string(),
            parent_id: None,
            device_ids: vec!["a".to_string(), "b".to_string()],
            position: None,
        });
        graph.locations.push(Location {
            id: "dc2".to_string(),
            name: "DC 2".to_string(),
            parent_id: None,
            device_ids: vec!["b".to_string()],
            position: None,
        });
        let map = graph.device_locations();
        assert_eq!(map.get("a"), Some(&"dc1"));
        assert_eq!(map.get("b"), Some(&"dc2"));
    }
}
