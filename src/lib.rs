#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod graph;
pub mod layout;
pub mod layout_dump;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{LayoutOptions, load_options};
pub use graph::NetworkGraph;
pub use layout::{
    LayoutEngine, LayoutError, LayoutResult, available_engines, compute_layout, create_engine,
    register_engine,
};
