use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout `{0}` does not exist")]
    UnknownLayout(String),
    #[error("edge `{edge}` references missing node `{node}`")]
    MissingNode { edge: String, node: String },
    #[error("edge `{0}` is not part of the graph")]
    UnknownEdge(String),
    #[error("making `{cluster}` the parent of `{child}` would create a cycle")]
    ClusterCycle { child: String, cluster: String },
}
