use thiserror::Error;

/// Failures a layout call can report. Unresolved link endpoints and
/// degenerate geometry are handled in-band (skipped edges, minimal boxes) and
/// never surface here.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("unknown layout engine `{name}` (available: {})", .available.join(", "))]
    UnknownEngine {
        name: String,
        available: Vec<String>,
    },

    #[error("subgraph parent chain contains a cycle through `{id}`")]
    CyclicSubgraph { id: String },
}
