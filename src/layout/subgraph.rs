//! Rank-based layout with recursively nested subgraph regions. Subgraphs are
//! laid out deepest-first in local coordinates, then each subtree is
//! translated into place as an opaque box, which keeps sibling regions from
//! overlapping.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Instant;

use log::debug;

use crate::config::{
    BOUNDS_MARGIN, EMPTY_LAYOUT_HEIGHT, EMPTY_LAYOUT_WIDTH, EMPTY_SUBGRAPH_HEIGHT,
    EMPTY_SUBGRAPH_WIDTH, LayoutOptions, SUBGRAPH_CONTROL_FACTOR, SUBGRAPH_LABEL_HEIGHT,
    SUBGRAPH_NODE_HEIGHT, SUBGRAPH_NODE_SPACING, SUBGRAPH_NODE_WIDTH, SUBGRAPH_PADDING,
    SUBGRAPH_RANK_SPACING, SUBGRAPH_SPACING,
};
use crate::graph::{Direction, Link, NetworkGraph};

use super::types::{Bounds, LayoutEdge, LayoutGroup, LayoutNode, LayoutResult, Point, Size};
use super::{LayoutEngine, LayoutError};

/// A positioned device box. `x`/`y` are the box center.
struct ItemBox {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    rank: i64,
    parent: Option<String>,
}

struct SubgraphState {
    nodes: Vec<String>,
    children: Vec<String>,
    parent: Option<String>,
    bounds: Bounds,
    depth: usize,
    direction: Direction,
}

struct ResolvedSubgraphOptions {
    node_spacing: f32,
    rank_spacing: f32,
}

pub struct SubgraphEngine;

impl LayoutEngine for SubgraphEngine {
    fn name(&self) -> &'static str {
        "hierarchical-v2"
    }

    fn layout(
        &self,
        graph: &NetworkGraph,
        options: &LayoutOptions,
    ) -> Result<LayoutResult, LayoutError> {
        let start = Instant::now();
        let direction = graph.settings.direction.unwrap_or_default();
        let resolved = ResolvedSubgraphOptions {
            node_spacing: options.node_spacing.unwrap_or(SUBGRAPH_NODE_SPACING),
            rank_spacing: options.rank_spacing.unwrap_or(SUBGRAPH_RANK_SPACING),
        };

        let mut items: BTreeMap<String, ItemBox> = BTreeMap::new();
        for device in &graph.devices {
            let (width, height) = device
                .size
                .map(|s| (s.width, s.height))
                .unwrap_or((SUBGRAPH_NODE_WIDTH, SUBGRAPH_NODE_HEIGHT));
            items.insert(
                device.id.clone(),
                ItemBox {
                    x: 0.0,
                    y: 0.0,
                    width,
                    height,
                    rank: 0,
                    parent: device.parent.clone(),
                },
            );
        }

        let mut subgraphs: BTreeMap<String, SubgraphState> = graph
            .subgraphs
            .iter()
            .map(|sg| {
                (
                    sg.id.clone(),
                    SubgraphState {
                        nodes: sg.nodes.clone(),
                        children: sg.children.clone(),
                        parent: sg.parent.clone(),
                        bounds: Bounds::default(),
                        depth: 0,
                        direction: sg.direction.unwrap_or(direction),
                    },
                )
            })
            .collect();

        compute_depths(&mut subgraphs)?;
        adopt_members(&mut subgraphs, &items);

        assign_ranks(&mut items, &graph.links);

        let mut order: Vec<String> = subgraphs.keys().cloned().collect();
        order.sort_by(|a, b| subgraphs[b].depth.cmp(&subgraphs[a].depth));
        debug!(
            "hierarchical-v2: {} subgraphs, max depth {}",
            order.len(),
            subgraphs.values().map(|sg| sg.depth).max().unwrap_or(0)
        );

        for id in &order {
            layout_subgraph(id, &mut subgraphs, &mut items, &resolved);
        }

        layout_root_level(&mut subgraphs, &mut items, direction, &resolved);

        let edges = link_paths(&graph.links, &items, direction);

        let mut nodes: BTreeMap<String, LayoutNode> = BTreeMap::new();
        for device in &graph.devices {
            let item = &items[&device.id];
            nodes.insert(
                device.id.clone(),
                LayoutNode {
                    id: device.id.clone(),
                    position: Point::new(item.x, item.y),
                    size: Size::new(item.width, item.height),
                    pinned: false,
                },
            );
        }

        let mut groups: BTreeMap<String, LayoutGroup> = BTreeMap::new();
        for (id, sg) in &subgraphs {
            groups.insert(
                id.clone(),
                LayoutGroup {
                    id: id.clone(),
                    bounds: sg.bounds,
                    children: sg.nodes.clone(),
                },
            );
        }

        let bounds = total_bounds(&nodes, &groups);

        let mut result = LayoutResult::new(self.name());
        result.metadata.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        result.nodes = nodes;
        result.edges = edges;
        result.subgraphs = groups;
        result.bounds = bounds;
        Ok(result)
    }
}

/// Walk each parent chain to the root. A chain that revisits an id is
/// malformed input and is reported instead of silently truncated.
fn compute_depths(subgraphs: &mut BTreeMap<String, SubgraphState>) -> Result<(), LayoutError> {
    let ids: Vec<String> = subgraphs.keys().cloned().collect();

    for id in &ids {
        let mut chain: Vec<String> = Vec::new();
        let mut visited: BTreeSet<String> = BTreeSet::new();
        let mut current = id.clone();

        loop {
            if !visited.insert(current.clone()) {
                return Err(LayoutError::CyclicSubgraph { id: current });
            }
            chain.push(current.clone());
            match subgraphs.get(&current).and_then(|sg| sg.parent.clone()) {
                Some(parent) if subgraphs.contains_key(&parent) => current = parent,
                _ => break,
            }
        }

        let len = chain.len();
        for (offset, member) in chain.into_iter().enumerate() {
            if let Some(sg) = subgraphs.get_mut(&member) {
                sg.depth = len - 1 - offset;
            }
        }
    }

    Ok(())
}

/// Fold device `parent` references and subgraph `parent` back-references into
/// the explicit membership lists.
fn adopt_members(subgraphs: &mut BTreeMap<String, SubgraphState>, items: &BTreeMap<String, ItemBox>) {
    for (id, item) in items {
        let Some(parent) = item.parent.as_ref() else {
            continue;
        };
        if let Some(sg) = subgraphs.get_mut(parent) {
            if !sg.nodes.contains(id) {
                sg.nodes.push(id.clone());
            }
        }
    }

    let links: Vec<(String, String)> = subgraphs
        .iter()
        .filter_map(|(id, sg)| sg.parent.clone().map(|parent| (parent, id.clone())))
        .collect();
    for (parent, child) in links {
        if let Some(sg) = subgraphs.get_mut(&parent) {
            if !sg.children.contains(&child) {
                sg.children.push(child);
            }
        }
    }
}

/// BFS from in-degree-0 roots; a device's rank never decreases when reached
/// again over a longer path.
fn assign_ranks(items: &mut BTreeMap<String, ItemBox>, links: &[Link]) {
    let mut outgoing: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut incoming: BTreeMap<String, usize> = items.keys().map(|id| (id.clone(), 0)).collect();

    for link in links {
        let from = &link.source.device_id;
        let to = &link.target.device_id;
        if incoming.contains_key(from) && incoming.contains_key(to) {
            outgoing.entry(from.clone()).or_default().push(to.clone());
            *incoming.get_mut(to).unwrap() += 1;
        }
    }

    let mut queue: VecDeque<String> = incoming
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| id.clone())
        .collect();
    let mut visited: BTreeSet<String> = BTreeSet::new();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let rank = items[&id].rank;
        let targets = outgoing.get(&id).cloned().unwrap_or_default();
        for target in targets {
            if let Some(item) = items.get_mut(&target) {
                item.rank = item.rank.max(rank + 1);
                queue.push_back(target);
            }
        }
    }
}

/// Lay out one subgraph in local coordinates: member nodes rank by rank along
/// the primary axis, child subgraphs appended after them, bounds wrapped
/// around the lot with padding and label headroom.
fn layout_subgraph(
    id: &str,
    subgraphs: &mut BTreeMap<String, SubgraphState>,
    items: &mut BTreeMap<String, ItemBox>,
    resolved: &ResolvedSubgraphOptions,
) {
    let (member_ids, child_ids, direction) = {
        let sg = &subgraphs[id];
        (sg.nodes.clone(), sg.children.clone(), sg.direction)
    };
    let vertical = direction.is_vertical();

    let members: Vec<String> = member_ids
        .iter()
        .filter(|m| items.contains_key(*m))
        .cloned()
        .collect();
    let children: Vec<String> = child_ids
        .iter()
        .filter(|c| subgraphs.contains_key(*c))
        .cloned()
        .collect();

    if members.is_empty() && children.is_empty() {
        subgraphs.get_mut(id).unwrap().bounds =
            Bounds::new(0.0, 0.0, EMPTY_SUBGRAPH_WIDTH, EMPTY_SUBGRAPH_HEIGHT);
        return;
    }

    let mut nodes_by_rank: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for member in &members {
        nodes_by_rank
            .entry(items[member].rank)
            .or_default()
            .push(member.clone());
    }

    let mut current_main = SUBGRAPH_PADDING + SUBGRAPH_LABEL_HEIGHT;

    for rank_members in nodes_by_rank.values() {
        let mut current_cross = SUBGRAPH_PADDING;
        let mut max_main_size = 0.0f32;

        for member in rank_members {
            let item = items.get_mut(member).unwrap();
            if vertical {
                item.x = current_cross + item.width / 2.0;
                item.y = current_main + item.height / 2.0;
                current_cross += item.width + resolved.node_spacing;
                max_main_size = max_main_size.max(item.height);
            } else {
                item.x = current_main + item.width / 2.0;
                item.y = current_cross + item.height / 2.0;
                current_cross += item.height + resolved.node_spacing;
                max_main_size = max_main_size.max(item.width);
            }
        }

        current_main += max_main_size + resolved.rank_spacing;
    }

    for child in &children {
        let child_bounds = subgraphs[child].bounds;
        let (offset_x, offset_y) = if vertical {
            let dx = SUBGRAPH_PADDING - child_bounds.x;
            let dy = current_main - child_bounds.y;
            current_main += child_bounds.height + SUBGRAPH_SPACING;
            (dx, dy)
        } else {
            let dx = current_main - child_bounds.x;
            let dy = SUBGRAPH_PADDING + SUBGRAPH_LABEL_HEIGHT - child_bounds.y;
            current_main += child_bounds.width + SUBGRAPH_SPACING;
            (dx, dy)
        };
        offset_subtree(child, subgraphs, items, offset_x, offset_y);
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for member in &members {
        let item = &items[member];
        min_x = min_x.min(item.x - item.width / 2.0);
        min_y = min_y.min(item.y - item.height / 2.0);
        max_x = max_x.max(item.x + item.width / 2.0);
        max_y = max_y.max(item.y + item.height / 2.0);
    }
    for child in &children {
        let b = subgraphs[child].bounds;
        min_x = min_x.min(b.x);
        min_y = min_y.min(b.y);
        max_x = max_x.max(b.right());
        max_y = max_y.max(b.bottom());
    }

    subgraphs.get_mut(id).unwrap().bounds = if min_x == f32::INFINITY {
        Bounds::new(0.0, 0.0, EMPTY_SUBGRAPH_WIDTH, EMPTY_SUBGRAPH_HEIGHT)
    } else {
        Bounds {
            x: min_x - SUBGRAPH_PADDING,
            y: min_y - SUBGRAPH_PADDING - SUBGRAPH_LABEL_HEIGHT,
            width: max_x - min_x + SUBGRAPH_PADDING * 2.0,
            height: max_y - min_y + SUBGRAPH_PADDING * 2.0 + SUBGRAPH_LABEL_HEIGHT,
        }
    };
}

/// Translate a subgraph and everything inside it, recursively. The parent
/// tree is acyclic by the time this runs (`compute_depths` rejected cycles),
/// but the seen-set keeps malformed explicit child lists from looping.
fn offset_subtree(
    root: &str,
    subgraphs: &mut BTreeMap<String, SubgraphState>,
    items: &mut BTreeMap<String, ItemBox>,
    dx: f32,
    dy: f32,
) {
    let mut stack = vec![root.to_string()];
    let mut seen: BTreeSet<String> = BTreeSet::new();

    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        let Some(sg) = subgraphs.get_mut(&id) else {
            continue;
        };
        sg.bounds.x += dx;
        sg.bounds.y += dy;
        let members = sg.nodes.clone();
        stack.extend(sg.children.iter().cloned());

        for member in members {
            if let Some(item) = items.get_mut(&member) {
                item.x += dx;
                item.y += dy;
            }
        }
    }
}

/// Pack root subgraphs sequentially along the primary axis, then lay the
/// ungrouped root nodes out after them.
fn layout_root_level(
    subgraphs: &mut BTreeMap<String, SubgraphState>,
    items: &mut BTreeMap<String, ItemBox>,
    direction: Direction,
    resolved: &ResolvedSubgraphOptions,
) {
    let vertical = direction.is_vertical();

    let root_subgraphs: Vec<String> = subgraphs
        .iter()
        .filter(|(_, sg)| {
            sg.parent
                .as_ref()
                .map(|p| !subgraphs.contains_key(p))
                .unwrap_or(true)
        })
        .map(|(id, _)| id.clone())
        .collect();

    let root_nodes: Vec<String> = items
        .iter()
        .filter(|(_, item)| {
            item.parent
                .as_ref()
                .map(|p| !subgraphs.contains_key(p))
                .unwrap_or(true)
        })
        .map(|(id, _)| id.clone())
        .collect();

    let mut current_pos = 0.0f32;

    for id in &root_subgraphs {
        let bounds = subgraphs[id].bounds;
        let (dx, dy) = if vertical {
            (0.0, current_pos - bounds.y)
        } else {
            (current_pos - bounds.x, 0.0)
        };
        offset_subtree(id, subgraphs, items, dx, dy);
        current_pos += if vertical { bounds.height } else { bounds.width } + SUBGRAPH_SPACING;
    }

    let mut cross_pos = 0.0f32;
    for id in &root_nodes {
        let item = items.get_mut(id).unwrap();
        if vertical {
            item.x = cross_pos + item.width / 2.0;
            item.y = current_pos + item.height / 2.0;
            cross_pos += item.width + resolved.node_spacing;
        } else {
            item.x = current_pos + item.width / 2.0;
            item.y = cross_pos + item.height / 2.0;
            cross_pos += item.height + resolved.node_spacing;
        }
    }
}

/// Cubic bezier per link: anchors on the node boundaries facing each other,
/// control points at 40% of the inter-anchor distance along the primary axis.
fn link_paths(
    links: &[Link],
    items: &BTreeMap<String, ItemBox>,
    direction: Direction,
) -> BTreeMap<String, LayoutEdge> {
    let mut edges = BTreeMap::new();
    let vertical = direction.is_vertical();

    for link in links {
        let Some(from) = items.get(&link.source.device_id) else {
            continue;
        };
        let Some(to) = items.get(&link.target.device_id) else {
            continue;
        };

        let (from_point, to_point) = if vertical {
            if from.y < to.y {
                (
                    Point::new(from.x, from.y + from.height / 2.0),
                    Point::new(to.x, to.y - to.height / 2.0),
                )
            } else {
                (
                    Point::new(from.x, from.y - from.height / 2.0),
                    Point::new(to.x, to.y + to.height / 2.0),
                )
            }
        } else if from.x < to.x {
            (
                Point::new(from.x + from.width / 2.0, from.y),
                Point::new(to.x - to.width / 2.0, to.y),
            )
        } else {
            (
                Point::new(from.x - from.width / 2.0, from.y),
                Point::new(to.x + to.width / 2.0, to.y),
            )
        };

        let dx = to_point.x - from_point.x;
        let dy = to_point.y - from_point.y;

        let (ctrl1, ctrl2) = if vertical {
            let ctrl_dist = dy.abs() * SUBGRAPH_CONTROL_FACTOR;
            (
                Point::new(from_point.x, from_point.y + dy.signum() * ctrl_dist),
                Point::new(to_point.x, to_point.y - dy.signum() * ctrl_dist),
            )
        } else {
            let ctrl_dist = dx.abs() * SUBGRAPH_CONTROL_FACTOR;
            (
                Point::new(from_point.x + dx.signum() * ctrl_dist, from_point.y),
                Point::new(to_point.x - dx.signum() * ctrl_dist, to_point.y),
            )
        };

        edges.insert(
            link.id.clone(),
            LayoutEdge {
                id: link.id.clone(),
                source: link.source.device_id.clone(),
                target: link.target.device_id.clone(),
                points: vec![from_point, ctrl1, ctrl2, to_point],
            },
        );
    }

    edges
}

fn total_bounds(
    nodes: &BTreeMap<String, LayoutNode>,
    subgraphs: &BTreeMap<String, LayoutGroup>,
) -> Bounds {
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
    for group in subgraphs.values() {
        min_x = min_x.min(group.bounds.x);
        min_y = min_y.min(group.bounds.y);
        max_x = max_x.max(group.bounds.right());
        max_y = max_y.max(group.bounds.bottom());
    }

    if min_x == f32::INFINITY {
        return Bounds::new(0.0, 0.0, EMPTY_LAYOUT_WIDTH, EMPTY_LAYOUT_HEIGHT);
    }

    Bounds {
        x: min_x - BOUNDS_MARGIN,
        y: min_y - BOUNDS_MARGIN,
        width: max_x - min_x + BOUNDS_MARGIN * 2.0,
        height: max_y - min_y + BOUNDS_MARGIN * 2.0,
    }
}
