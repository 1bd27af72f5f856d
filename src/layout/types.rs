use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A positioned device. `position` is the node center.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutNode {
    pub id: String,
    pub position: Point,
    pub size: Size,
    /// Position came from a manual override and must not be rewritten by the
    /// placement passes that honor manual positions.
    #[serde(skip)]
    pub pinned: bool,
}

impl LayoutNode {
    pub fn bounds(&self) -> Bounds {
        Bounds {
            x: self.position.x - self.size.width / 2.0,
            y: self.position.y - self.size.height / 2.0,
            width: self.size.width,
            height: self.size.height,
        }
    }
}

/// A routed link. An empty `points` list means both endpoints resolved but no
/// routing pass ran; links with unresolved endpoints keep it empty on purpose.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub points: Vec<Point>,
}

/// Bounding box of a module, location, or subgraph plus its member ids.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutGroup {
    pub id: String,
    pub bounds: Bounds,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutMetadata {
    pub algorithm: String,
    /// Wall-clock layout time. Excluded from determinism comparisons.
    pub duration_ms: f64,
    pub iterations: Option<usize>,
}

/// Pure-data output of one `layout()` call, owned solely by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutResult {
    pub nodes: BTreeMap<String, LayoutNode>,
    pub edges: BTreeMap<String, LayoutEdge>,
    pub modules: BTreeMap<String, LayoutGroup>,
    pub locations: BTreeMap<String, LayoutGroup>,
    pub subgraphs: BTreeMap<String, LayoutGroup>,
    pub bounds: Bounds,
    pub metadata: LayoutMetadata,
}

impl LayoutResult {
    pub fn new(algorithm: &str) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            modules: BTreeMap::new(),
            locations: BTreeMap::new(),
            subgraphs: BTreeMap::new(),
            bounds: Bounds::default(),
            metadata: LayoutMetadata {
                algorithm: algorithm.to_string(),
                duration_ms: 0.0,
                iterations: None,
            },
        }
    }
}
