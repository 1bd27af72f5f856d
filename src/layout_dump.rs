//! Flat JSON view of a [`LayoutResult`], consumed by renderers and useful as
//! a diffable artifact when tuning layouts.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::layout::{Bounds, LayoutGroup, LayoutResult};

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub algorithm: String,
    pub duration_ms: f64,
    pub iterations: Option<usize>,
    pub bounds: Bounds,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub modules: Vec<GroupDump>,
    pub locations: Vec<GroupDump>,
    pub subgraphs: Vec<GroupDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
pub struct GroupDump {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub children: Vec<String>,
}

fn group_dumps<'a>(groups: impl Iterator<Item = &'a LayoutGroup>) -> Vec<GroupDump> {
    groups
        .map(|group| GroupDump {
            id: group.id.clone(),
            x: group.bounds.x,
            y: group.bounds.y,
            width: group.bounds.width,
            height: group.bounds.height,
            children: group.children.clone(),
        })
        .collect()
}

impl LayoutDump {
    pub fn from_result(result: &LayoutResult) -> Self {
        let nodes = result
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.id.clone(),
                x: node.position.x,
                y: node.position.y,
                width: node.size.width,
                height: node.size.height,
            })
            .collect();

        let edges = result
            .edges
            .values()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                points: edge.points.iter().map(|p| [p.x, p.y]).collect(),
            })
            .collect();

        LayoutDump {
            algorithm: result.metadata.algorithm.clone(),
            duration_ms: result.metadata.duration_ms,
            iterations: result.metadata.iterations,
            bounds: result.bounds,
            nodes,
            edges,
            modules: group_dumps(result.modules.values()),
            locations: group_dumps(result.locations.values()),
            subgraphs: group_dumps(result.subgraphs.values()),
        }
    }
}

pub fn write_layout_dump(path: &Path, result: &LayoutResult) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_result(result);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutOptions;
    use crate::graph::NetworkGraph;
    use crate::layout::compute_layout;

    #[test]
    fn dump_round_trips_through_json() {
        let graph: NetworkGraph = serde_json::from_str(
            r#"{
                "devices": [{"id": "a"}, {"id": "b"}],
                "links": [{"id": "l", "source": {"deviceId": "a"}, "target": {"deviceId": "b"}}]
            }"#,
        )
        .unwrap();
        let result = compute_layout(&graph, "hierarchical", &LayoutOptions::default()).unwrap();
        let dump = LayoutDump::from_result(&result);

        let json = serde_json::to_string(&dump).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["algorithm"], "hierarchical");
        assert_eq!(value["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(value["edges"][0]["id"], "l");
    }
}
