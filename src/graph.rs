use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{Dimension, Point};

/// Separator between the parts of an edge label key (dagre wire form).
pub const EDGE_KEY_DELIM: char = '\u{1}';
/// Name used for edges registered without one.
pub const DEFAULT_EDGE_NAME: char = '\u{0}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMeta {
    /// The caller-supplied `dimension` is authoritative and must not be
    /// replaced by layout defaults.
    #[serde(default)]
    pub force_dimensions: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<Dimension>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    #[serde(default)]
    pub meta: NodeMeta,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_dimension(mut self, width: f64, height: f64) -> Self {
        self.dimension = Some(Dimension::new(width, height));
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Point::new(x, y));
        self
    }

    pub fn position_or_origin(&self) -> Point {
        self.position.unwrap_or_default()
    }

    /// Dimension to lay the node out with: the caller's size when given (or
    /// forced), otherwise `fallback`. Zero sizes count as missing.
    pub fn resolved_dimension(&self, fallback: Dimension) -> Dimension {
        match self.dimension {
            Some(dim) if self.meta.force_dimensions => dim,
            Some(dim) => Dimension::new(
                if dim.width > 0.0 { dim.width } else { fallback.width },
                if dim.height > 0.0 { dim.height } else { fallback.height },
            ),
            None => fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    #[serde(flatten)]
    pub node: Node,
    #[serde(default)]
    pub child_node_ids: Vec<String>,
}

impl ClusterNode {
    pub fn new(id: impl Into<String>, children: &[&str]) -> Self {
        Self {
            node: Node::new(id),
            child_node_ids: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    #[serde(default, skip_deserializing)]
    pub points: Vec<Point>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id_str(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Label key this edge is registered under.
    pub fn key(&self, multigraph: bool) -> EdgeKey {
        EdgeKey {
            source: self.source.clone(),
            target: self.target.clone(),
            name: if multigraph { self.id.clone() } else { None },
        }
    }
}

/// Identity of an edge label: ordered endpoints plus an optional name that
/// disambiguates parallel edges in a multigraph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
    pub name: Option<String>,
}

impl EdgeKey {
    pub fn new(source: &str, target: &str, name: Option<&str>) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            name: name.map(str::to_string),
        }
    }

    /// Whether an edge with these endpoints and id is the one this key names.
    /// Without multigraph matching only the endpoints are compared.
    pub fn matches(&self, source: &str, target: &str, id: Option<&str>, multigraph: bool) -> bool {
        if self.source != source || self.target != target {
            return false;
        }
        !multigraph || self.name.as_deref() == id
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{EDGE_KEY_DELIM}{}{EDGE_KEY_DELIM}", self.source, self.target)?;
        match &self.name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{DEFAULT_EDGE_NAME}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeLabel {
    pub source: String,
    pub target: String,
    pub name: Option<String>,
    pub points: Vec<Point>,
}

impl EdgeLabel {
    pub fn new(key: &EdgeKey, points: Vec<Point>) -> Self {
        Self {
            source: key.source.clone(),
            target: key.target.clone(),
            name: key.name.clone(),
            points,
        }
    }
}

/// Monotonic id source owned by one graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdGenerator {
    prefix: String,
    next: u64,
}

impl IdGenerator {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    pub fn next_id(&mut self) -> String {
        self.next += 1;
        let prefix = if self.prefix.is_empty() { "e" } else { &self.prefix };
        format!("{prefix}{}", self.next)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub clusters: Vec<ClusterNode>,
    #[serde(skip)]
    pub edge_labels: BTreeMap<EdgeKey, EdgeLabel>,
    #[serde(skip)]
    pub ids: IdGenerator,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn cluster(&self, id: &str) -> Option<&ClusterNode> {
        self.clusters.iter().find(|c| c.node.id == id)
    }

    /// Node or cluster with this id.
    pub fn any_node(&self, id: &str) -> Option<&Node> {
        self.node(id).or_else(|| self.cluster(id).map(|c| &c.node))
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id.as_deref() == Some(id))
    }

    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn add_edge(&mut self, edge: Edge) -> &mut Self {
        self.edges.push(edge);
        self
    }

    pub fn add_cluster(&mut self, cluster: ClusterNode) -> &mut Self {
        self.clusters.push(cluster);
        self
    }

    /// Gives every id-less edge a fresh id that does not collide with an
    /// existing one.
    pub fn assign_missing_edge_ids(&mut self) {
        let taken: std::collections::HashSet<String> =
            self.edges.iter().filter_map(|e| e.id.clone()).collect();
        for edge in &mut self.edges {
            if edge.id.is_some() {
                continue;
            }
            let mut candidate = self.ids.next_id();
            while taken.contains(&candidate) {
                candidate = self.ids.next_id();
            }
            edge.id = Some(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_key_renders_dagre_wire_form() {
        let key = EdgeKey::new("a", "b", None);
        assert_eq!(key.to_string(), "a\u{1}b\u{1}\u{0}");
        let named = EdgeKey::new("a", "b", Some("e1"));
        assert_eq!(named.to_string(), "a\u{1}b\u{1}e1");
    }

    #[test]
    fn key_match_ignores_name_outside_multigraph() {
        let key = EdgeKey::new("a", "b", Some("x"));
        assert!(key.matches("a", "b", Some("y"), false));
        assert!(!key.matches("a", "b", Some("y"), true));
        assert!(key.matches("a", "b", Some("x"), true));
    }

    #[test]
    fn assigns_ids_without_colliding() {
        let mut graph = Graph::new();
        graph
            .add_edge(Edge::new("a", "b").with_id("e1"))
            .add_edge(Edge::new("b", "c"))
            .add_edge(Edge::new("c", "a"));
        graph.assign_missing_edge_ids();
        let ids: Vec<_> = graph.edges.iter().map(|e| e.id_str().to_string()).collect();
        assert_eq!(ids, vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn forced_dimension_is_kept_even_when_zero() {
        let mut node = Node::new("n").with_dimension(0.0, 12.0);
        let fallback = Dimension::new(20.0, 30.0);
        assert_eq!(node.resolved_dimension(fallback), Dimension::new(20.0, 12.0));
        node.meta.force_dimensions = true;
        assert_eq!(node.resolved_dimension(fallback), Dimension::new(0.0, 12.0));
    }

    #[test]
    fn deserializes_camel_case_input() {
        let raw = r#"{
            "nodes": [{"id": "a", "dimension": {"width": 40, "height": 10}}],
            "edges": [{"source": "a", "target": "a", "points": [{"x": 1, "y": 1}]}],
            "clusters": [{"id": "g", "childNodeIds": ["a"]}]
        }"#;
        let graph: Graph = serde_json::from_str(raw).expect("valid graph");
        assert_eq!(graph.clusters[0].child_node_ids, vec!["a"]);
        assert!(graph.edges[0].points.is_empty());
        assert_eq!(graph.nodes[0].dimension, Some(Dimension::new(40.0, 10.0)));
    }
}
