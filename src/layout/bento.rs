//! Grid-packing layout: module cells packed into a grid whose shape tracks
//! the golden ratio, devices arranged in an inner sub-grid per cell.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use log::debug;

use crate::config::{
    BENTO_CELL_SIZE, DEFAULT_MODULE_PADDING, GOLDEN_RATIO, LayoutOptions,
};
use crate::graph::{Device, DeviceRole, DeviceType, NetworkGraph};

use super::base::{calculate_bounds, create_edges, create_modules, create_nodes, route_edges};
use super::types::{LayoutNode, LayoutResult, Point};
use super::{LayoutEngine, LayoutError};

struct BentoCell {
    column: usize,
    row: usize,
    colspan: usize,
    rowspan: usize,
    devices: Vec<String>,
}

struct BentoGrid {
    columns: usize,
    rows: usize,
    occupied: Vec<Vec<bool>>,
}

pub struct BentoEngine;

impl LayoutEngine for BentoEngine {
    fn name(&self) -> &'static str {
        "bento"
    }

    fn layout(
        &self,
        graph: &NetworkGraph,
        options: &LayoutOptions,
    ) -> Result<LayoutResult, LayoutError> {
        let start = Instant::now();

        let mut nodes = create_nodes(&graph.devices, options);
        let mut edges = create_edges(&graph.links);

        let mut cells = organize_cells(graph);
        let mut grid = create_optimal_grid(&cells);
        debug!(
            "bento: {} cells into a {}x{} grid",
            cells.len(),
            grid.columns,
            grid.rows
        );
        place_cells(&mut cells, &mut grid);
        position_devices_in_cells(&cells, &mut nodes, options);

        route_edges(&mut edges, &nodes, options.edge_routing);

        let modules = create_modules(&graph.modules, &nodes);
        let bounds = calculate_bounds(&nodes);

        let mut result = LayoutResult::new(self.name());
        result.metadata.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        result.nodes = nodes;
        result.edges = edges;
        result.modules = modules;
        result.bounds = bounds;
        Ok(result)
    }
}

/// Build cells from declared modules (honoring span hints, with a trailing
/// cell for leftovers) or auto-detect groupings by role and type.
fn organize_cells(graph: &NetworkGraph) -> Vec<BentoCell> {
    let mut cells = Vec::new();

    if !graph.modules.is_empty() {
        for module in &graph.modules {
            let mut cell = BentoCell {
                column: 0,
                row: 0,
                colspan: 1,
                rowspan: 1,
                devices: module.devices.clone(),
            };
            if let Some(span) = module.layout.as_ref().and_then(|hints| hints.span) {
                cell.colspan = span.columns.max(1);
                cell.rowspan = span.rows.max(1);
            }
            cells.push(cell);
        }

        let assigned: BTreeSet<&str> = cells
            .iter()
            .flat_map(|cell| cell.devices.iter().map(String::as_str))
            .collect();
        let unassigned: Vec<String> = graph
            .devices
            .iter()
            .filter(|device| !assigned.contains(device.id.as_str()))
            .map(|device| device.id.clone())
            .collect();
        if !unassigned.is_empty() {
            cells.push(BentoCell {
                column: 0,
                row: 0,
                colspan: 1,
                rowspan: 1,
                devices: unassigned,
            });
        }
    } else {
        for group in auto_detect_groups(&graph.devices) {
            cells.push(BentoCell {
                column: 0,
                row: 0,
                colspan: 1,
                rowspan: 1,
                devices: group,
            });
        }
    }

    cells
}

/// Group by role first (two or more members required), then sweep the
/// remainder into per-type groups.
fn auto_detect_groups(devices: &[Device]) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut grouped: BTreeSet<String> = BTreeSet::new();

    let mut role_groups: BTreeMap<DeviceRole, Vec<String>> = BTreeMap::new();
    for device in devices {
        if let Some(role) = device.role {
            role_groups.entry(role).or_default().push(device.id.clone());
        }
    }
    for group in role_groups.into_values() {
        if group.len() >= 2 {
            for id in &group {
                grouped.insert(id.clone());
            }
            groups.push(group);
        }
    }

    let mut type_groups: BTreeMap<DeviceType, Vec<String>> = BTreeMap::new();
    for device in devices {
        if !grouped.contains(device.id.as_str()) {
            type_groups
                .entry(device.kind)
                .or_default()
                .push(device.id.clone());
        }
    }
    for group in type_groups.into_values() {
        // Singletons get their own cell too.
        groups.push(group);
    }

    groups
}

/// Scan candidate column counts and keep the grid whose aspect ratio lands
/// closest to the golden ratio.
fn create_optimal_grid(cells: &[BentoCell]) -> BentoGrid {
    let total_area: usize = cells.iter().map(|cell| cell.colspan * cell.rowspan).sum();

    let mut best_columns = 1usize;
    let mut best_rows = 1usize;
    let mut best_ratio_diff = f32::INFINITY;

    let max_columns = (total_area as f32).sqrt().ceil().max(1.0) as usize;
    for columns in 1..=max_columns {
        let rows = total_area.div_ceil(columns).max(1);
        let ratio = columns as f32 / rows as f32;
        let ratio_diff = (ratio - GOLDEN_RATIO).abs();
        if ratio_diff < best_ratio_diff {
            best_ratio_diff = ratio_diff;
            best_columns = columns;
            best_rows = rows;
        }
    }

    BentoGrid {
        columns: best_columns,
        rows: best_rows,
        occupied: vec![vec![false; best_columns]; best_rows],
    }
}

/// Largest cells first, greedily dropped into the first free span in a
/// row-major scan; the grid grows a row when nothing fits.
fn place_cells(cells: &mut [BentoCell], grid: &mut BentoGrid) {
    cells.sort_by(|a, b| (b.colspan * b.rowspan).cmp(&(a.colspan * a.rowspan)));

    for cell in cells.iter_mut() {
        if try_place(cell, grid) {
            continue;
        }

        // No free span: extend the grid with a fresh row.
        grid.rows += 1;
        grid.occupied.push(vec![false; grid.columns]);
        cell.column = 0;
        cell.row = grid.rows - 1;
        for c in 0..cell.colspan.min(grid.columns) {
            grid.occupied[cell.row][c] = true;
        }
    }
}

fn try_place(cell: &mut BentoCell, grid: &mut BentoGrid) -> bool {
    if grid.rows < cell.rowspan || grid.columns < cell.colspan {
        return false;
    }

    for row in 0..=(grid.rows - cell.rowspan) {
        for col in 0..=(grid.columns - cell.colspan) {
            let free = (0..cell.rowspan)
                .all(|r| (0..cell.colspan).all(|c| !grid.occupied[row + r][col + c]));
            if !free {
                continue;
            }

            cell.column = col;
            cell.row = row;
            for r in 0..cell.rowspan {
                for c in 0..cell.colspan {
                    grid.occupied[row + r][col + c] = true;
                }
            }
            return true;
        }
    }

    false
}

/// Center a lone device in its cell; arrange groups in a `ceil(sqrt(n))`
/// column sub-grid evenly spaced inside the padded cell.
fn position_devices_in_cells(
    cells: &[BentoCell],
    nodes: &mut BTreeMap<String, LayoutNode>,
    options: &LayoutOptions,
) {
    let padding = options.module_padding.unwrap_or(DEFAULT_MODULE_PADDING);

    for cell in cells {
        let cell_x = cell.column as f32 * BENTO_CELL_SIZE
            + (BENTO_CELL_SIZE * cell.colspan as f32) / 2.0;
        let cell_y =
            cell.row as f32 * BENTO_CELL_SIZE + (BENTO_CELL_SIZE * cell.rowspan as f32) / 2.0;
        let cell_width = BENTO_CELL_SIZE * cell.colspan as f32 - padding * 2.0;
        let cell_height = BENTO_CELL_SIZE * cell.rowspan as f32 - padding * 2.0;

        let members: Vec<String> = cell
            .devices
            .iter()
            .filter(|id| nodes.contains_key(*id))
            .cloned()
            .collect();

        if members.is_empty() {
            continue;
        }

        if members.len() == 1 {
            if let Some(node) = nodes.get_mut(&members[0]) {
                node.position = Point::new(cell_x, cell_y);
            }
            continue;
        }

        let cols = (members.len() as f32).sqrt().ceil() as usize;
        let rows = members.len().div_ceil(cols);
        let spacing_x = cell_width / (cols + 1) as f32;
        let spacing_y = cell_height / (rows + 1) as f32;

        for (index, id) in members.iter().enumerate() {
            let Some(node) = nodes.get_mut(id) else {
                continue;
            };
            let col = index % cols;
            let row = index / cols;
            node.position = Point::new(
                cell_x - cell_width / 2.0 + spacing_x * (col + 1) as f32,
                cell_y - cell_height / 2.0 + spacing_y * (row + 1) as f32,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Module, ModuleLayoutHints, ModuleSpan};

    fn device(id: &str, kind: DeviceType, role: Option<DeviceRole>) -> Device {
        Device {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            role,
            position: None,
            size: None,
            parent: None,
        }
    }

    fn module(id: &str, devices: &[&str]) -> Module {
        Module {
            id: id.to_string(),
            name: id.to_string(),
            devices: devices.iter().map(|d| d.to_string()).collect(),
            modules: Vec::new(),
            layout: None,
        }
    }

    #[test]
    fn five_devices_fill_a_three_by_two_inner_grid() {
        let mut graph = NetworkGraph::new();
        for i in 0..5 {
            graph.devices.push(device(&format!("s{i}"), DeviceType::Server, None));
        }
        graph.modules.push(module("farm", &["s0", "s1", "s2", "s3", "s4"]));

        let result = BentoEngine.layout(&graph, &LayoutOptions::default()).unwrap();

        let mut xs: Vec<i64> = result
            .nodes
            .values()
            .map(|n| n.position.x.round() as i64)
            .collect();
        xs.sort();
        xs.dedup();
        let mut ys: Vec<i64> = result
            .nodes
            .values()
            .map(|n| n.position.y.round() as i64)
            .collect();
        ys.sort();
        ys.dedup();
        // ceil(sqrt(5)) = 3 columns, ceil(5/3) = 2 rows.
        assert_eq!(xs.len(), 3);
        assert_eq!(ys.len(), 2);
    }

    #[test]
    fn lone_device_is_centered_in_its_cell() {
        let mut graph = NetworkGraph::new();
        graph.devices.push(device("solo", DeviceType::Router, None));
        graph.modules.push(module("m", &["solo"]));

        let result = BentoEngine.layout(&graph, &LayoutOptions::default()).unwrap();
        let node = &result.nodes["solo"];
        assert_eq!(node.position, Point::new(BENTO_CELL_SIZE / 2.0, BENTO_CELL_SIZE / 2.0));
    }

    #[test]
    fn span_hints_grow_the_grid_area() {
        let mut cells = vec![
            BentoCell {
                column: 0,
                row: 0,
                colspan: 2,
                rowspan: 2,
                devices: Vec::new(),
            },
            BentoCell {
                column: 0,
                row: 0,
                colspan: 1,
                rowspan: 1,
                devices: Vec::new(),
            },
        ];
        let mut grid = create_optimal_grid(&cells);
        assert!(grid.columns * grid.rows >= 5);

        place_cells(&mut cells, &mut grid);
        // Largest-first: the 2x2 cell claims the origin.
        assert_eq!((cells[0].column, cells[0].row), (0, 0));
        assert_eq!(cells[0].colspan * cells[0].rowspan, 4);
    }

    #[test]
    fn leftover_devices_get_a_trailing_cell() {
        let mut graph = NetworkGraph::new();
        graph.devices.push(device("in", DeviceType::Server, None));
        graph.devices.push(device("out", DeviceType::Server, None));
        graph.modules.push(module("m", &["in"]));

        let cells = organize_cells(&graph);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].devices, vec!["out".to_string()]);
    }

    #[test]
    fn auto_detection_prefers_roles_then_types() {
        let devices = vec![
            device("c1", DeviceType::Router, Some(DeviceRole::Core)),
            device("c2", DeviceType::Router, Some(DeviceRole::Core)),
            device("lonely", DeviceType::Firewall, Some(DeviceRole::Edge)),
            device("s1", DeviceType::Server, None),
            device("s2", DeviceType::Server, None),
        ];
        let groups = auto_detect_groups(&devices);
        // Core pair by role; the single edge device falls through to its
        // type group; servers group by type.
        assert_eq!(groups.len(), 3);
        assert!(groups.contains(&vec!["c1".to_string(), "c2".to_string()]));
        assert!(groups.contains(&vec!["lonely".to_string()]));
        assert!(groups.contains(&vec!["s1".to_string(), "s2".to_string()]));
    }

    #[test]
    fn unplaceable_span_extends_the_grid() {
        let mut cells = vec![BentoCell {
            column: 0,
            row: 0,
            colspan: 3,
            rowspan: 1,
            devices: Vec::new(),
        }];
        let mut grid = BentoGrid {
            columns: 2,
            rows: 1,
            occupied: vec![vec![false; 2]; 1],
        };
        place_cells(&mut cells, &mut grid);
        assert_eq!(grid.rows, 2);
        assert_eq!((cells[0].column, cells[0].row), (0, 1));
    }
}
