//! The layout engine family: every engine is a pure function of
//! `(graph, options)` behind the [`LayoutEngine`] trait, selected by name
//! through the registry in [`factory`].

pub(crate) mod base;
mod bento;
mod error;
mod factory;
mod hierarchical;
mod location;
mod subgraph;
pub(crate) mod types;

pub use bento::BentoEngine;
pub use error::LayoutError;
pub use factory::{EngineRegistry, available_engines, create_engine, register_engine};
pub use hierarchical::HierarchicalEngine;
pub use location::LocationEngine;
pub use subgraph::SubgraphEngine;
pub use types::*;

use crate::config::LayoutOptions;
use crate::graph::NetworkGraph;

/// A layout algorithm. `layout` must not mutate the engine: instances are
/// cached by the registry and may be shared across threads, so all working
/// state lives in locals owned by one call.
pub trait LayoutEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn layout(
        &self,
        graph: &NetworkGraph,
        options: &LayoutOptions,
    ) -> Result<LayoutResult, LayoutError>;
}

/// Run the named engine from the process-wide registry in one step.
pub fn compute_layout(
    graph: &NetworkGraph,
    engine: &str,
    options: &LayoutOptions,
) -> Result<LayoutResult, LayoutError> {
    create_engine(engine)?.layout(graph, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Device, DeviceType, Link, LinkEndpoint};

    fn two_node_graph() -> NetworkGraph {
        let mut graph = NetworkGraph::new();
        for id in ["a", "b"] {
            graph.devices.push(Device {
                id: id.to_string(),
                name: id.to_string(),
                kind: DeviceType::Router,
                role: None,
                position: None,
                size: None,
                parent: None,
            });
        }
        graph.links.push(Link {
            id: "l1".to_string(),
            source: LinkEndpoint {
                device_id: "a".to_string(),
                port_id: None,
            },
            target: LinkEndpoint {
                device_id: "b".to_string(),
                port_id: None,
            },
            bandwidth: None,
        });
        graph
    }

    #[test]
    fn compute_layout_dispatches_by_name() {
        let graph = two_node_graph();
        let options = LayoutOptions::default();
        for name in ["hierarchical", "bento", "location-based", "hierarchical-v2"] {
            let result = compute_layout(&graph, name, &options).unwrap();
            assert_eq!(result.metadata.algorithm, name);
            assert_eq!(result.nodes.len(), 2);
        }
    }

    #[test]
    fn compute_layout_rejects_unknown_names() {
        let graph = two_node_graph();
        let err = compute_layout(&graph, "no-such-engine", &LayoutOptions::default()).unwrap_err();
        assert!(matches!(err, LayoutError::UnknownEngine { .. }));
    }

    #[test]
    fn custom_engines_join_the_global_registry() {
        struct Stub;
        impl LayoutEngine for Stub {
            fn name(&self) -> &'static str {
                "stub"
            }
            fn layout(
                &self,
                _graph: &NetworkGraph,
                _options: &LayoutOptions,
            ) -> Result<LayoutResult, LayoutError> {
                Ok(LayoutResult::new(self.name()))
            }
        }

        register_engine("stub", std::sync::Arc::new(Stub));
        assert!(available_engines().contains(&"stub".to_string()));
        let result = compute_layout(
            &NetworkGraph::new(),
            "stub",
            &LayoutOptions::default(),
        )
        .unwrap();
        assert_eq!(result.metadata.algorithm, "stub");
    }
}
