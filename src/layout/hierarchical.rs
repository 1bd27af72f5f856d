//! Layered layout driven by network tiers: edge devices on top, then core,
//! distribution, and access. Devices without a mapped role are slotted in by
//! connectivity.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Instant;

use log::debug;

use crate::config::{
    BARYCENTER_RESPACING, BARYCENTER_SWEEPS, DEFAULT_LAYER_SPACING, DEFAULT_NODE_SPACING,
    DENSE_LAYER_THRESHOLD, DENSE_SPACING_FACTOR, DISCONNECTED_RANK_OFFSET, LAYER_ROW_WRAP_THRESHOLD,
    LAYER_Y_OFFSET, LayoutOptions, WRAPPED_ROW_GAP,
};
use crate::graph::{DeviceRole, NetworkGraph};

use super::base::{calculate_bounds, create_edges, create_modules, create_nodes, route_edges};
use super::types::{LayoutNode, LayoutResult};
use super::{LayoutEngine, LayoutError};

/// Rank a role maps to. External connectivity sits on top of the diagram.
fn role_rank(role: DeviceRole) -> Option<i64> {
    match role {
        DeviceRole::Edge => Some(0),
        DeviceRole::Core => Some(1),
        DeviceRole::Distribution => Some(2),
        DeviceRole::Access => Some(3),
        DeviceRole::Management => None,
    }
}

struct Layer {
    level: i64,
    nodes: Vec<String>,
}

pub struct HierarchicalEngine;

impl LayoutEngine for HierarchicalEngine {
    fn name(&self) -> &'static str {
        "hierarchical"
    }

    fn layout(
        &self,
        graph: &NetworkGraph,
        options: &LayoutOptions,
    ) -> Result<LayoutResult, LayoutError> {
        let start = Instant::now();

        let mut nodes = create_nodes(&graph.devices, options);
        let mut edges = create_edges(&graph.links);

        let adjacency = build_adjacency(graph);
        let mut layers = detect_layers(graph, &adjacency);
        debug!(
            "hierarchical: {} devices across {} layers (levels {:?})",
            graph.devices.len(),
            layers.len(),
            layers.iter().map(|l| l.level).collect::<Vec<_>>()
        );

        position_layers(&layers, &mut nodes, options);
        minimize_crossings(&mut layers, &adjacency, &mut nodes);

        route_edges(&mut edges, &nodes, options.edge_routing);

        let modules = create_modules(&graph.modules, &nodes);
        let bounds = calculate_bounds(&nodes);

        let mut result = LayoutResult::new(self.name());
        result.metadata.iterations = Some(layers.len());
        result.metadata.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        result.nodes = nodes;
        result.edges = edges;
        result.modules = modules;
        result.bounds = bounds;
        Ok(result)
    }
}

/// Undirected adjacency over resolvable links.
fn build_adjacency(graph: &NetworkGraph) -> BTreeMap<String, BTreeSet<String>> {
    let mut adjacency: BTreeMap<String, BTreeSet<String>> = graph
        .devices
        .iter()
        .map(|device| (device.id.clone(), BTreeSet::new()))
        .collect();

    for link in &graph.links {
        let source = link.source.device_id.clone();
        let target = link.target.device_id.clone();
        if adjacency.contains_key(&source) && adjacency.contains_key(&target) {
            adjacency.get_mut(&source).unwrap().insert(target.clone());
            adjacency.get_mut(&target).unwrap().insert(source);
        }
    }

    adjacency
}

/// Assign every device a rank: role table first, connectivity BFS for the
/// rest, then group into layers sorted by level.
fn detect_layers(graph: &NetworkGraph, adjacency: &BTreeMap<String, BTreeSet<String>>) -> Vec<Layer> {
    let mut device_levels: BTreeMap<String, i64> = BTreeMap::new();
    let mut has_roles = false;

    for device in &graph.devices {
        if let Some(rank) = device.role.and_then(role_rank) {
            device_levels.insert(device.id.clone(), rank);
            has_roles = true;
        }
    }

    if !has_roles || device_levels.len() < graph.devices.len() {
        assign_levels_by_connectivity(graph, adjacency, &mut device_levels);
    }

    let mut layer_map: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for device in &graph.devices {
        if let Some(&level) = device_levels.get(&device.id) {
            layer_map.entry(level).or_default().push(device.id.clone());
        }
    }

    layer_map
        .into_iter()
        .map(|(level, nodes)| Layer { level, nodes })
        .collect()
}

/// BFS from the highest-degree unassigned device (first wins on ties),
/// starting one level past whatever the role table already claimed. Unreached
/// devices land two levels further down so they read as an appendix rather
/// than a tier.
fn assign_levels_by_connectivity(
    graph: &NetworkGraph,
    adjacency: &BTreeMap<String, BTreeSet<String>>,
    device_levels: &mut BTreeMap<String, i64>,
) {
    let mut root: Option<String> = None;
    let mut max_degree = 0usize;

    for device in &graph.devices {
        if device_levels.contains_key(&device.id) {
            continue;
        }
        let degree = adjacency.get(&device.id).map(BTreeSet::len).unwrap_or(0);
        if degree > max_degree || root.is_none() {
            max_degree = degree;
            root = Some(device.id.clone());
        }
    }

    let start_level = device_levels.values().copied().max().unwrap_or(-1) + 1;

    let mut queue: VecDeque<(String, i64)> = VecDeque::new();
    let mut visited: BTreeSet<String> = BTreeSet::new();
    if let Some(root) = root {
        visited.insert(root.clone());
        queue.push_back((root, start_level));
    }

    while let Some((id, level)) = queue.pop_front() {
        device_levels.entry(id.clone()).or_insert(level);

        if let Some(neighbors) = adjacency.get(&id) {
            for neighbor in neighbors {
                if visited.insert(neighbor.clone()) {
                    queue.push_back((neighbor.clone(), level + 1));
                }
            }
        }
    }

    for device in &graph.devices {
        device_levels
            .entry(device.id.clone())
            .or_insert(start_level + DISCONNECTED_RANK_OFFSET);
    }
}

/// Place each layer on its own horizontal band, centered about x = 0. Dense
/// layers tighten sibling spacing; very wide layers wrap into two rows.
fn position_layers(layers: &[Layer], nodes: &mut BTreeMap<String, LayoutNode>, options: &LayoutOptions) {
    let layer_spacing = options.layer_spacing.unwrap_or(DEFAULT_LAYER_SPACING);
    let node_spacing = options.node_spacing.unwrap_or(DEFAULT_NODE_SPACING);

    for (layer_index, layer) in layers.iter().enumerate() {
        let y = layer_index as f32 * layer_spacing + LAYER_Y_OFFSET;

        let adjusted_spacing = if layer.nodes.len() > DENSE_LAYER_THRESHOLD {
            node_spacing * DENSE_SPACING_FACTOR
        } else {
            node_spacing
        };

        if layer.nodes.len() > LAYER_ROW_WRAP_THRESHOLD {
            let nodes_per_row = layer.nodes.len().div_ceil(2);
            let row_width = (nodes_per_row - 1) as f32 * adjusted_spacing;

            for (node_index, node_id) in layer.nodes.iter().enumerate() {
                let Some(node) = nodes.get_mut(node_id) else {
                    continue;
                };
                if node.pinned {
                    continue;
                }
                let row = node_index / nodes_per_row;
                let col = node_index % nodes_per_row;
                node.position.x = col as f32 * adjusted_spacing - row_width / 2.0;
                node.position.y = y + row as f32 * WRAPPED_ROW_GAP;
            }
        } else {
            let layer_width = (layer.nodes.len().saturating_sub(1)) as f32 * adjusted_spacing;
            for (node_index, node_id) in layer.nodes.iter().enumerate() {
                let Some(node) = nodes.get_mut(node_id) else {
                    continue;
                };
                if node.pinned {
                    continue;
                }
                node.position.x = node_index as f32 * adjusted_spacing - layer_width / 2.0;
                node.position.y = y;
            }
        }
    }
}

/// Barycenter sweeps: three forward, three backward, reordering each layer by
/// the mean index of its neighbors in the adjacent layer.
fn minimize_crossings(
    layers: &mut [Layer],
    adjacency: &BTreeMap<String, BTreeSet<String>>,
    nodes: &mut BTreeMap<String, LayoutNode>,
) {
    for _ in 0..BARYCENTER_SWEEPS {
        for i in 1..layers.len() {
            let reference = layers[i - 1].nodes.clone();
            order_layer_by_barycenter(&mut layers[i], &reference, adjacency, nodes);
        }

        for i in (0..layers.len().saturating_sub(1)).rev() {
            let reference = layers[i + 1].nodes.clone();
            order_layer_by_barycenter(&mut layers[i], &reference, adjacency, nodes);
        }
    }
}

fn order_layer_by_barycenter(
    layer: &mut Layer,
    reference: &[String],
    adjacency: &BTreeMap<String, BTreeSet<String>>,
    nodes: &mut BTreeMap<String, LayoutNode>,
) {
    let reference_positions: BTreeMap<&str, usize> = reference
        .iter()
        .enumerate()
        .map(|(index, id)| (id.as_str(), index))
        .collect();

    let mut barycenters: Vec<(String, f64)> = layer
        .nodes
        .iter()
        .map(|node_id| {
            let mut sum = 0.0f64;
            let mut count = 0usize;
            if let Some(neighbors) = adjacency.get(node_id) {
                for neighbor in neighbors {
                    if let Some(&pos) = reference_positions.get(neighbor.as_str()) {
                        sum += pos as f64;
                        count += 1;
                    }
                }
            }
            // Nodes with no positioned reference sort after everything else.
            let barycenter = if count > 0 {
                sum / count as f64
            } else {
                f64::INFINITY
            };
            (node_id.clone(), barycenter)
        })
        .collect();

    barycenters.sort_by(|a, b| a.1.partial_cmp(&b.1).expect("barycenter is never NaN"));
    layer.nodes = barycenters.into_iter().map(|(id, _)| id).collect();

    let layer_width = (layer.nodes.len().saturating_sub(1)) as f32 * BARYCENTER_RESPACING;
    for (index, node_id) in layer.nodes.iter().enumerate() {
        if let Some(node) = nodes.get_mut(node_id) {
            node.position.x = index as f32 * BARYCENTER_RESPACING - layer_width / 2.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Device, DeviceType, Link, LinkEndpoint};

    fn device(id: &str, role: Option<DeviceRole>) -> Device {
        Device {
            id: id.to_string(),
            name: id.to_string(),
            kind: DeviceType::Unknown,
            role,
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

    fn levels_of(graph: &NetworkGraph) -> BTreeMap<String, i64> {
        let adjacency = build_adjacency(graph);
        let layers = detect_layers(graph, &adjacency);
        let mut out = BTreeMap::new();
        for layer in layers {
            for id in layer.nodes {
                out.insert(id, layer.level);
            }
        }
        out
    }

    #[test]
    fn role_table_is_independent_of_topology() {
        let mut graph = NetworkGraph::new();
        graph.devices.push(device("c", Some(DeviceRole::Core)));
        graph.devices.push(device("a", Some(DeviceRole::Access)));

        let levels = levels_of(&graph);
        assert_eq!(levels["c"], 1);
        assert_eq!(levels["a"], 3);
    }

    #[test]
    fn chain_without_roles_gets_bfs_ranks() {
        let mut graph = NetworkGraph::new();
        graph.devices.push(device("a", None));
        graph.devices.push(device("b", None));
        graph.links.push(link("l1", "a", "b"));

        let levels = levels_of(&graph);
        let mut ranks: Vec<i64> = levels.values().copied().collect();
        ranks.sort();
        assert_eq!(ranks, vec![0, 1]);
    }

    #[test]
    fn bfs_ranks_never_decrease_along_chain() {
        let mut graph = NetworkGraph::new();
        for id in ["a", "b", "c", "d"] {
            graph.devices.push(device(id, None));
        }
        graph.links.push(link("l1", "a", "b"));
        graph.links.push(link("l2", "b", "c"));
        graph.links.push(link("l3", "c", "d"));
        // Make "a" the highest-degree root.
        graph.devices.push(device("a2", None));
        graph.links.push(link("l4", "a", "a2"));

        let levels = levels_of(&graph);
        assert!(levels["b"] >= levels["a"]);
        assert!(levels["c"] >= levels["b"]);
        assert!(levels["d"] >= levels["c"]);
    }

    #[test]
    fn disconnected_devices_land_below_the_bfs_levels() {
        let mut graph = NetworkGraph::new();
        graph.devices.push(device("a", None));
        graph.devices.push(device("b", None));
        graph.devices.push(device("island", None));
        graph.links.push(link("l1", "a", "b"));

        let levels = levels_of(&graph);
        assert_eq!(levels["island"], DISCONNECTED_RANK_OFFSET);
    }

    #[test]
    fn partial_roles_fill_in_past_the_mapped_ranks() {
        let mut graph = NetworkGraph::new();
        graph.devices.push(device("core", Some(DeviceRole::Core)));
        graph.devices.push(device("mystery", None));
        graph.links.push(link("l1", "core", "mystery"));

        let levels = levels_of(&graph);
        assert_eq!(levels["core"], 1);
        // BFS starts past the highest role rank.
        assert_eq!(levels["mystery"], 2);
    }

    #[test]
    fn wide_layer_wraps_into_two_rows() {
        let mut graph = NetworkGraph::new();
        for i in 0..8 {
            graph.devices.push(device(&format!("acc{i}"), Some(DeviceRole::Access)));
        }
        let result = HierarchicalEngine
            .layout(&graph, &LayoutOptions::default())
            .unwrap();

        let mut ys: Vec<i64> = result
            .nodes
            .values()
            .map(|n| n.position.y.round() as i64)
            .collect();
        ys.sort();
        ys.dedup();
        assert_eq!(ys.len(), 2);
        assert_eq!((ys[1] - ys[0]) as f32, WRAPPED_ROW_GAP);
    }

    #[test]
    fn barycenter_order_is_stable_after_three_sweeps() {
        let mut graph = NetworkGraph::new();
        for id in ["e1", "e2"] {
            graph.devices.push(device(id, Some(DeviceRole::Edge)));
        }
        for id in ["c1", "c2", "c3"] {
            graph.devices.push(device(id, Some(DeviceRole::Core)));
        }
        // Crossed wiring that the sweeps untangle.
        graph.links.push(link("l1", "e1", "c3"));
        graph.links.push(link("l2", "e2", "c1"));
        graph.links.push(link("l3", "e2", "c2"));

        let adjacency = build_adjacency(&graph);
        let mut layers = detect_layers(&graph, &adjacency);
        let mut nodes = create_nodes(&graph.devices, &LayoutOptions::default());
        position_layers(&layers, &mut nodes, &LayoutOptions::default());
        minimize_crossings(&mut layers, &adjacency, &mut nodes);

        let order_after_sweeps: Vec<Vec<String>> =
            layers.iter().map(|l| l.nodes.clone()).collect();
        minimize_crossings(&mut layers, &adjacency, &mut nodes);
        let order_after_extra: Vec<Vec<String>> =
            layers.iter().map(|l| l.nodes.clone()).collect();
        assert_eq!(order_after_sweeps, order_after_extra);
    }
}
