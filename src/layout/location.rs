//! Content-first layout for physically grouped networks: each location is
//! sized from its device count, locations pack into rows, and links are
//! routed differently inside a location than between locations.

use std::collections::BTreeMap;
use std::time::Instant;

use log::debug;

use crate::config::{
    BOUNDS_MARGIN, DEFAULT_DEVICE_COLUMNS, DEFAULT_LOCATION_PADDING, DEFAULT_LOCATION_SPACING,
    LOCATION_LABEL_HEADROOM, LOCATION_NODE_SIZE, LOCATION_NODE_SPACING, LayoutOptions,
    MAX_CURVATURE, MAX_LOCATION_ROW_WIDTH, MIN_LOCATION_HEIGHT, MIN_LOCATION_WIDTH,
};
use crate::graph::{Location, NetworkGraph};

use super::base::{calculate_bounds, create_edges, create_modules, create_nodes, route_edges};
use super::types::{Bounds, LayoutEdge, LayoutGroup, LayoutNode, LayoutResult, Point, Size};
use super::{LayoutEngine, LayoutError};

struct ResolvedLocationOptions {
    spacing: f32,
    padding: f32,
    columns: usize,
    min_size: Size,
    cell_size: f32,
}

impl ResolvedLocationOptions {
    fn resolve(options: &LayoutOptions) -> Self {
        let node_size = options.node_size.unwrap_or(LOCATION_NODE_SIZE);
        let node_spacing = options.node_spacing.unwrap_or(LOCATION_NODE_SPACING);
        Self {
            spacing: options.location_spacing.unwrap_or(DEFAULT_LOCATION_SPACING),
            padding: options.location_padding.unwrap_or(DEFAULT_LOCATION_PADDING),
            columns: options.device_columns.unwrap_or(DEFAULT_DEVICE_COLUMNS).max(1),
            min_size: options
                .min_location_size
                .map(|s| Size::new(s.width, s.height))
                .unwrap_or(Size::new(MIN_LOCATION_WIDTH, MIN_LOCATION_HEIGHT)),
            cell_size: node_size + node_spacing,
        }
    }
}

pub struct LocationEngine;

impl LayoutEngine for LocationEngine {
    fn name(&self) -> &'static str {
        "location-based"
    }

    fn layout(
        &self,
        graph: &NetworkGraph,
        options: &LayoutOptions,
    ) -> Result<LayoutResult, LayoutError> {
        let start = Instant::now();
        let resolved = ResolvedLocationOptions::resolve(options);

        let mut nodes = create_nodes(&graph.devices, options);
        let mut edges = create_edges(&graph.links);

        let mut locations: BTreeMap<String, LayoutGroup> = BTreeMap::new();

        if !graph.locations.is_empty() {
            let sizes = calculate_location_sizes(&graph.locations, &resolved);
            let positions = position_locations(&graph.locations, &sizes, resolved.spacing);
            debug!(
                "location-based: packed {} of {} locations",
                positions.len(),
                graph.locations.len()
            );

            for location in &graph.locations {
                let Some(bounds) = positions.get(&location.id) else {
                    continue;
                };
                if !location.device_ids.is_empty() {
                    position_devices_in_location(
                        &location.device_ids,
                        &mut nodes,
                        bounds,
                        &resolved,
                    );
                }
            }

            for location in &graph.locations {
                let Some(bounds) = positions.get(&location.id) else {
                    continue;
                };
                locations.insert(
                    location.id.clone(),
                    LayoutGroup {
                        id: location.id.clone(),
                        bounds: *bounds,
                        children: location.device_ids.clone(),
                    },
                );
            }
        }

        if locations.is_empty() {
            route_edges(&mut edges, &nodes, options.edge_routing);
        } else {
            route_edges_with_locations(&mut edges, &nodes, &locations, graph);
        }

        let modules = create_modules(&graph.modules, &nodes);
        let bounds = bounds_with_locations(&nodes, &locations);

        let mut result = LayoutResult::new(self.name());
        result.metadata.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        result.nodes = nodes;
        result.edges = edges;
        result.modules = modules;
        result.locations = locations;
        result.bounds = bounds;
        Ok(result)
    }
}

/// Required size from packing the device count into at most `columns`
/// columns, floored by the explicit override and the minimum size. Empty
/// locations get the minimum outright.
fn calculate_location_sizes(
    locations: &[Location],
    resolved: &ResolvedLocationOptions,
) -> BTreeMap<String, Size> {
    let mut sizes = BTreeMap::new();

    for location in locations {
        let device_count = location.device_ids.len();
        if device_count == 0 {
            sizes.insert(location.id.clone(), resolved.min_size);
            continue;
        }

        let cols = resolved.columns.min(device_count);
        let rows = device_count.div_ceil(cols);
        let required_width = cols as f32 * resolved.cell_size + resolved.padding * 2.0;
        let required_height = rows as f32 * resolved.cell_size + resolved.padding * 2.0;

        let explicit_width = location.position.and_then(|p| p.width).unwrap_or(0.0);
        let explicit_height = location.position.and_then(|p| p.height).unwrap_or(0.0);

        sizes.insert(
            location.id.clone(),
            Size::new(
                required_width.max(explicit_width).max(resolved.min_size.width),
                required_height
                    .max(explicit_height)
                    .max(resolved.min_size.height),
            ),
        );
    }

    sizes
}

/// Pack root locations left-to-right, wrapping past the max row width.
/// Explicit positions bypass the packer and do not advance the cursor.
fn position_locations(
    locations: &[Location],
    sizes: &BTreeMap<String, Size>,
    spacing: f32,
) -> BTreeMap<String, Bounds> {
    let mut positions = BTreeMap::new();

    let mut current_x = 0.0f32;
    let mut current_y = 0.0f32;
    let mut row_max_height = 0.0f32;

    for location in locations.iter().filter(|l| l.parent_id.is_none()) {
        let size = sizes
            .get(&location.id)
            .copied()
            .unwrap_or(Size::new(MIN_LOCATION_WIDTH, MIN_LOCATION_HEIGHT));

        if current_x > 0.0 && current_x + size.width > MAX_LOCATION_ROW_WIDTH {
            current_x = 0.0;
            current_y += row_max_height + spacing;
            row_max_height = 0.0;
        }

        let explicit = location.position;
        let x = explicit.map(|p| p.x).unwrap_or(current_x);
        let y = explicit.map(|p| p.y).unwrap_or(current_y);

        positions.insert(
            location.id.clone(),
            Bounds::new(x, y, size.width, size.height),
        );

        if explicit.is_none() {
            current_x += size.width + spacing;
            row_max_height = row_max_height.max(size.height);
        }
    }

    positions
}

/// Devices fill a centered grid inside their location, wrapping at the
/// resolved column count.
fn position_devices_in_location(
    device_ids: &[String],
    nodes: &mut BTreeMap<String, LayoutNode>,
    bounds: &Bounds,
    resolved: &ResolvedLocationOptions,
) {
    let cols = resolved.columns.min(device_ids.len()).max(1);
    let grid_width = cols as f32 * resolved.cell_size;

    let start_x = bounds.x + (bounds.width - grid_width) / 2.0 + resolved.cell_size / 2.0;
    let start_y = bounds.y + resolved.padding + resolved.cell_size / 2.0;

    for (index, device_id) in device_ids.iter().enumerate() {
        let Some(node) = nodes.get_mut(device_id) else {
            continue;
        };
        let col = index % cols;
        let row = index / cols;
        node.position = Point::new(
            start_x + col as f32 * resolved.cell_size,
            start_y + row as f32 * resolved.cell_size,
        );
    }
}

/// Intra-location links get a soft bezier; cross-location links are routed
/// orthogonally through the gap between the two location boxes so they never
/// cut a boundary diagonally.
fn route_edges_with_locations(
    edges: &mut BTreeMap<String, LayoutEdge>,
    nodes: &BTreeMap<String, LayoutNode>,
    locations: &BTreeMap<String, LayoutGroup>,
    graph: &NetworkGraph,
) {
    let device_locations = graph.device_locations();

    for edge in edges.values_mut() {
        let Some(source) = nodes.get(&edge.source) else {
            continue;
        };
        let Some(target) = nodes.get(&edge.target) else {
            continue;
        };

        let source_location = device_locations.get(edge.source.as_str());
        let target_location = device_locations.get(edge.target.as_str());

        let cross = match (source_location, target_location) {
            (Some(s), Some(t)) => s != t,
            _ => false,
        };

        if cross {
            let source_bounds = source_location.and_then(|id| locations.get(*id));
            let target_bounds = target_location.and_then(|id| locations.get(*id));
            if let (Some(source_group), Some(target_group)) = (source_bounds, target_bounds) {
                edge.points = cross_location_route(
                    source.position,
                    target.position,
                    &source_group.bounds,
                    &target_group.bounds,
                );
            }
        } else {
            edge.points = curved_route(source.position, target.position);
        }
    }
}

/// Cubic bezier whose control offset direction depends on whether the span
/// is more horizontal or vertical.
fn curved_route(source: Point, target: Point) -> Vec<Point> {
    let dx = target.x - source.x;
    let dy = target.y - source.y;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance <= f32::EPSILON {
        return vec![source];
    }

    let curvature = (distance * 0.3).min(MAX_CURVATURE);

    let (ctrl1, ctrl2) = if dx.abs() > dy.abs() {
        let curve_dir = if dy >= 0.0 { -1.0 } else { 1.0 };
        (
            Point::new(source.x + dx * 0.3, source.y + curve_dir * curvature),
            Point::new(source.x + dx * 0.7, target.y + curve_dir * curvature),
        )
    } else {
        let curve_dir = if dx >= 0.0 { -1.0 } else { 1.0 };
        (
            Point::new(source.x + curve_dir * curvature, source.y + dy * 0.3),
            Point::new(target.x + curve_dir * curvature, source.y + dy * 0.7),
        )
    };

    vec![source, ctrl1, ctrl2, target]
}

/// Orthogonal polyline through the gap between two location boxes. The shape
/// depends on where the target box sits relative to the source box; diagonal
/// and overlapping boxes fall back to whichever horizontal gap exists.
fn cross_location_route(
    source: Point,
    target: Point,
    source_bounds: &Bounds,
    target_bounds: &Bounds,
) -> Vec<Point> {
    let mut points = vec![source];

    let source_right = source_bounds.right();
    let source_bottom = source_bounds.bottom();
    let target_right = target_bounds.right();
    let target_bottom = target_bounds.bottom();

    let target_is_right = target_bounds.x > source_right;
    let target_is_left = target_right < source_bounds.x;
    let target_is_below = target_bounds.y > source_bottom;
    let target_is_above = target_bottom < source_bounds.y;

    if target_is_right && !target_is_below && !target_is_above {
        let gap_x = (source_right + target_bounds.x) / 2.0;
        points.push(Point::new(source_right, source.y));
        points.push(Point::new(gap_x, source.y));
        points.push(Point::new(gap_x, target.y));
        points.push(Point::new(target_bounds.x, target.y));
    } else if target_is_left && !target_is_below && !target_is_above {
        let gap_x = (target_right + source_bounds.x) / 2.0;
        points.push(Point::new(source_bounds.x, source.y));
        points.push(Point::new(gap_x, source.y));
        points.push(Point::new(gap_x, target.y));
        points.push(Point::new(target_right, target.y));
    } else if target_is_below {
        let gap_y = (source_bottom + target_bounds.y) / 2.0;
        points.push(Point::new(source.x, source_bottom));
        points.push(Point::new(source.x, gap_y));
        points.push(Point::new(target.x, gap_y));
        points.push(Point::new(target.x, target_bounds.y));
    } else if target_is_above {
        let gap_y = (target_bottom + source_bounds.y) / 2.0;
        points.push(Point::new(source.x, source_bounds.y));
        points.push(Point::new(source.x, gap_y));
        points.push(Point::new(target.x, gap_y));
        points.push(Point::new(target.x, target_bottom));
    } else if target_bounds.x > source_bounds.x {
        let gap_x = (source_right + target_bounds.x) / 2.0;
        points.push(Point::new(source_right, source.y));
        points.push(Point::new(gap_x, source.y));
        points.push(Point::new(gap_x, target.y));
        points.push(Point::new(target_bounds.x, target.y));
    } else {
        let gap_x = (target_right + source_bounds.x) / 2.0;
        points.push(Point::new(source_bounds.x, source.y));
        points.push(Point::new(gap_x, source.y));
        points.push(Point::new(gap_x, target.y));
        points.push(Point::new(target_right, target.y));
    }

    points.push(target);
    points
}

/// Combined extent of nodes and location boxes, with label headroom above
/// each location and an outer margin. Empty input stays at the origin.
fn bounds_with_locations(
    nodes: &BTreeMap<String, LayoutNode>,
    locations: &BTreeMap<String, LayoutGroup>,
) -> Bounds {
    if nodes.is_empty() && locations.is_empty() {
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

    for group in locations.values() {
        min_x = min_x.min(group.bounds.x);
        min_y = min_y.min(group.bounds.y - LOCATION_LABEL_HEADROOM);
        max_x = max_x.max(group.bounds.right());
        max_y = max_y.max(group.bounds.bottom());
    }

    Bounds {
        x: min_x - BOUNDS_MARGIN,
        y: min_y - BOUNDS_MARGIN,
        width: max_x - min_x + BOUNDS_MARGIN * 2.0,
        height: max_y - min_y + BOUNDS_MARGIN * 2.0,
    }
}
