//! Shared primitives used by every engine: node/edge/module construction from
//! the graph, bounds calculation, and the stock edge routing strategies.

use std::collections::BTreeMap;

use crate::config::{
    DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH, EdgeRouting, LayoutOptions, MAX_CURVATURE,
    MODULE_BOUNDS_PADDING, ORTHOGONAL_STUB_CLEARANCE, ORTHOGONAL_VERTICAL_THRESHOLD,
};
use crate::graph::{Device, Link, Module};

use super::types::{Bounds, LayoutEdge, LayoutGroup, LayoutNode, Point, Size};

/// Seed the node arena. A manual position is used verbatim only when both
/// axes are numeric and the options ask for it; everything else gets a
/// placeholder the concrete algorithm overwrites.
pub(crate) fn create_nodes(
    devices: &[Device],
    options: &LayoutOptions,
) -> BTreeMap<String, LayoutNode> {
    let mut nodes = BTreeMap::new();

    for (index, device) in devices.iter().enumerate() {
        let manual = device.position.as_ref().and_then(|p| p.resolved());
        let pinned = manual.is_some() && options.respect_manual_positions;

        let position = match manual {
            Some((x, y)) if pinned => Point::new(x, y),
            _ => Point::new(index as f32 * 100.0, 0.0),
        };

        let size = device
            .size
            .map(|s| Size::new(s.width, s.height))
            .unwrap_or(Size::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT));

        nodes.insert(
            device.id.clone(),
            LayoutNode {
                id: device.id.clone(),
                position,
                size,
                pinned,
            },
        );
    }

    nodes
}

pub(crate) fn create_edges(links: &[Link]) -> BTreeMap<String, LayoutEdge> {
    let mut edges = BTreeMap::new();

    for link in links {
        edges.insert(
            link.id.clone(),
            LayoutEdge {
                id: link.id.clone(),
                source: link.source.device_id.clone(),
                target: link.target.device_id.clone(),
                points: Vec::new(),
            },
        );
    }

    edges
}

/// Box each module around its member extents. Modules with no resolvable
/// members are omitted rather than producing degenerate bounds.
pub(crate) fn create_modules(
    modules: &[Module],
    nodes: &BTreeMap<String, LayoutNode>,
) -> BTreeMap<String, LayoutGroup> {
    let mut groups = BTreeMap::new();

    for module in modules {
        let Some(bounds) = member_bounds(&module.devices, nodes, MODULE_BOUNDS_PADDING) else {
            continue;
        };
        groups.insert(
            module.id.clone(),
            LayoutGroup {
                id: module.id.clone(),
                bounds,
                children: module.devices.clone(),
            },
        );
    }

    groups
}

/// Min/max extent of the named nodes plus padding; `None` when no id resolves.
pub(crate) fn member_bounds(
    ids: &[String],
    nodes: &BTreeMap<String, LayoutNode>,
    padding: f32,
) -> Option<Bounds> {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    let mut matched = false;

    for id in ids {
        let Some(node) = nodes.get(id) else {
            continue;
        };
        matched = true;
        let b = node.bounds();
        min_x = min_x.min(b.x);
        min_y = min_y.min(b.y);
        max_x = max_x.max(b.right());
        max_y = max_y.max(b.bottom());
    }

    if !matched {
        return None;
    }

    Some(Bounds {
        x: min_x - padding,
        y: min_y - padding,
        width: max_x - min_x + padding * 2.0,
        height: max_y - min_y + padding * 2.0,
    })
}

/// Overall extent of the node set. Empty input yields a zero-sized box at the
/// origin, never NaN.
pub(crate) fn calculate_bounds(nodes: &BTreeMap<String, LayoutNode>) -> Bounds {
    if nodes.is_empty() {
        return Bounds::default();
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for node in nodes.values() {
        let b = node.bounds();
        min_x = min_x.min(b.x);
        min_y = min_y.min(b.y);
        max_x = max_x.max(b.right());
        max_y = max_y.max(b.bottom());
    }

    Bounds {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

/// Route every edge whose endpoints resolve; edges naming a missing node are
/// skipped, since reference validation belongs to the parser.
pub(crate) fn route_edges(
    edges: &mut BTreeMap<String, LayoutEdge>,
    nodes: &BTreeMap<String, LayoutNode>,
    routing: EdgeRouting,
) {
    for edge in edges.values_mut() {
        let Some(source) = nodes.get(&edge.source) else {
            continue;
        };
        let Some(target) = nodes.get(&edge.target) else {
            continue;
        };

        edge.points = match routing {
            EdgeRouting::Straight => vec![source.position, target.position],
            EdgeRouting::Curved => curved_path(source.position, target.position),
            EdgeRouting::Orthogonal => orthogonal_path(source, target),
        };
    }
}

/// Single-control-point curve: midpoint pushed perpendicular to the
/// source->target vector, capped at `MAX_CURVATURE`.
fn curved_path(source: Point, target: Point) -> Vec<Point> {
    let dx = target.x - source.x;
    let dy = target.y - source.y;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance <= f32::EPSILON {
        // Zero-length link collapses to a single-point track.
        return vec![source];
    }

    let curvature = MAX_CURVATURE.min(distance * 0.3);
    let mid_x = (source.x + target.x) / 2.0;
    let mid_y = (source.y + target.y) / 2.0;
    let perp_x = (-dy / distance) * curvature;
    let perp_y = (dx / distance) * curvature;

    vec![
        source,
        Point::new(mid_x + perp_x, mid_y + perp_y),
        target,
    ]
}

fn orthogonal_path(source: &LayoutNode, target: &LayoutNode) -> Vec<Point> {
    let dx = target.position.x - source.position.x;
    let dy = target.position.y - source.position.y;

    let source_offset = source.size.height / 2.0 + ORTHOGONAL_STUB_CLEARANCE;
    let target_offset = target.size.height / 2.0 + ORTHOGONAL_STUB_CLEARANCE;

    if dx.abs() < ORTHOGONAL_VERTICAL_THRESHOLD {
        // Near-vertical connection: short stubs out of both boxes.
        let source_sign = if dy > 0.0 { 1.0 } else { -1.0 };
        vec![
            source.position,
            Point::new(source.position.x, source.position.y + source_sign * source_offset),
            Point::new(target.position.x, target.position.y - source_sign * target_offset),
            target.position,
        ]
    } else {
        // Exit vertically, turn at the stub level, descend into the target.
        let mid_y = source.position.y + if dy > 0.0 { source_offset } else { -source_offset };
        vec![
            source.position,
            Point::new(source.position.x, mid_y),
            Point::new(target.position.x, mid_y),
            Point::new(target.position.x, target.position.y),
            target.position,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DeviceType, LinkEndpoint};

    fn device(id: &str) -> Device {
        Device {
            id: id.to_string(),
            name: id.to_string(),
            kind: DeviceType::Unknown,
            role: None,
            position: None,
            size: None,
            parent: None,
        }
    }

    fn link(id: &str, source: &str, target: &str) -> Link {
        Link {
            id: id.to_string(),
            source: LinkEndpoint {
                device_id: source.to_string(),
                port_id: None,
            },
            target: LinkEndpoint {
                device_id: target.to_string(),
                port_id: None,
            },
            bandwidth: None,
        }
    }

    #[test]
    fn manual_position_used_verbatim_when_requested() {
        let mut pinned = device("a");
        pinned.position = Some(serde_json::from_str(r#"{"x": 300, "y": 200}"#).unwrap());
        let mut auto = device("b");
        auto.position = Some(serde_json::from_str(r#"{"x": 300, "y": "auto"}"#).unwrap());

        let nodes = create_nodes(&[pinned.clone(), auto], &LayoutOptions::default());
        assert_eq!(nodes["a"].position, Point::new(300.0, 200.0));
        assert!(nodes["a"].pinned);
        // Half-auto positions fall back to the placeholder.
        assert_eq!(nodes["b"].position, Point::new(100.0, 0.0));
        assert!(!nodes["b"].pinned);

        let ignored = create_nodes(
            &[pinned],
            &LayoutOptions {
                respect_manual_positions: false,
                ..LayoutOptions::default()
            },
        );
        assert!(!ignored["a"].pinned);
        assert_eq!(ignored["a"].position, Point::new(0.0, 0.0));
    }

    #[test]
    fn empty_node_set_yields_zero_bounds() {
        let bounds = calculate_bounds(&BTreeMap::new());
        assert_eq!(bounds, Bounds::default());
    }

    #[test]
    fn module_without_resolvable_members_is_omitted() {
        let nodes = create_nodes(&[device("a")], &LayoutOptions::default());
        let modules = vec![
            Module {
                id: "m1".to_string(),
                name: String::new(),
                devices: vec!["a".to_string()],
                modules: Vec::new(),
                layout: None,
            },
            Module {
                id: "ghost".to_string(),
                name: String::new(),
                devices: vec!["nope".to_string()],
                modules: Vec::new(),
                layout: None,
            },
        ];
        let groups = create_modules(&modules, &nodes);
        assert!(groups.contains_key("m1"));
        assert!(!groups.contains_key("ghost"));
        // 80x60 node plus 40 padding on each side.
        let bounds = groups["m1"].bounds;
        assert_eq!(bounds.width, 160.0);
        assert_eq!(bounds.height, 140.0);
    }

    #[test]
    fn unresolved_edges_are_skipped_not_errored() {
        let nodes = create_nodes(&[device("a"), device("b")], &LayoutOptions::default());
        let mut edges = create_edges(&[link("ok", "a", "b"), link("dangling", "a", "ghost")]);
        route_edges(&mut edges, &nodes, EdgeRouting::Straight);
        assert_eq!(edges["ok"].points.len(), 2);
        assert!(edges["dangling"].points.is_empty());
    }

    #[test]
    fn curved_route_caps_control_offset() {
        let mut nodes = create_nodes(&[device("a"), device("b")], &LayoutOptions::default());
        nodes.get_mut("b").unwrap().position = Point::new(1000.0, 0.0);
        nodes.get_mut("a").unwrap().position = Point::new(0.0, 0.0);
        let mut edges = create_edges(&[link("l", "a", "b")]);
        route_edges(&mut edges, &nodes, EdgeRouting::Curved);

        let points = &edges["l"].points;
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].x, 500.0);
        assert_eq!(points[1].y.abs(), MAX_CURVATURE);
    }

    #[test]
    fn orthogonal_route_shape_depends_on_horizontal_span() {
        let mut nodes = create_nodes(&[device("a"), device("b")], &LayoutOptions::default());
        nodes.get_mut("a").unwrap().position = Point::new(0.0, 0.0);
        nodes.get_mut("b").unwrap().position = Point::new(10.0, 300.0);
        let mut edges = create_edges(&[link("l", "a", "b")]);
        route_edges(&mut edges, &nodes, EdgeRouting::Orthogonal);
        assert_eq!(edges["l"].points.len(), 4);

        nodes.get_mut("b").unwrap().position = Point::new(400.0, 300.0);
        route_edges(&mut edges, &nodes, EdgeRouting::Orthogonal);
        assert_eq!(edges["l"].points.len(), 5);
        // All segments are axis-aligned.
        for pair in edges["l"].points.windows(2) {
            assert!(pair[0].x == pair[1].x || pair[0].y == pair[1].y);
        }
    }
}
