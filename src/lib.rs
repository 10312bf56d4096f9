#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod geometry;
pub mod graph;
pub mod layout;
pub mod layout_dump;
pub mod path;
pub mod reconcile;
pub mod viewport;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutSettings, ViewportConfig, load_config};
pub use geometry::{AffineTransform, Dimension, Point, Rect};
pub use graph::{ClusterNode, Edge, EdgeKey, EdgeLabel, Graph, Node};
pub use layout::{Layout, LayoutError, LayoutKind, LayoutResult, get_layout};
pub use reconcile::{Frame, GraphBounds, Reconciler};
pub use viewport::Viewport;
