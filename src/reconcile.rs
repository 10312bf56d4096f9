//! Turns layout emissions into render frames.
//!
//! The reconciler keeps the edges of the previous frame so every new edge
//! can carry the path it animates from (`old_line`), and it remembers which
//! nodes were already on screen so only those animate into their new spot.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::ViewportConfig;
use crate::geometry::{Dimension, Point, Rect, fmt_num};
use crate::graph::{Edge, EdgeKey, EdgeLabel, Graph, Node};
use crate::path::{Curve, line};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFrame {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub position: Point,
    pub dimension: Dimension,
    /// `translate(..)` of the top-left corner.
    pub transform: String,
    /// Whether the node was on screen before and should move smoothly.
    pub animate: bool,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DominantBaseline {
    TextBeforeEdge,
    TextAfterEdge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeFrame {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    pub points: Vec<Point>,
    pub line: String,
    pub old_line: String,
    /// Path the label text runs along; reversed for right-to-left edges so
    /// the text never renders upside down.
    pub text_path: String,
    pub old_text_path: String,
    pub mid_point: Point,
    pub text_transform: String,
    pub dominant_baseline: DominantBaseline,
}

/// Axis-aligned extent of all placed nodes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl GraphBounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    pub fn rect(&self) -> Rect {
        Rect {
            x: self.min_x,
            y: self.min_y,
            width: self.width(),
            height: self.height(),
        }
    }

    /// Bounds of the nodes that have a position; all zero when none do.
    pub fn of_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        nodes
            .into_iter()
            .filter_map(|node| {
                let position = node.position?;
                let size = node.dimension.unwrap_or_default();
                Some(Rect::from_center(position, size))
            })
            .reduce(|acc, rect| acc.union(&rect))
            .map(|rect| GraphBounds {
                min_x: rect.x,
                min_y: rect.y,
                max_x: rect.right(),
                max_y: rect.bottom(),
            })
            .unwrap_or_default()
    }

    pub fn expand(&self, margin: f64) -> Self {
        GraphBounds {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub nodes: Vec<NodeFrame>,
    pub clusters: Vec<NodeFrame>,
    pub edges: Vec<EdgeFrame>,
    pub bounds: GraphBounds,
}

impl Frame {
    pub fn node(&self, id: &str) -> Option<&NodeFrame> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeFrame> {
        self.edges.iter().find(|e| e.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    curve: Curve,
    debounce: Duration,
    minimap_margin: Option<f64>,
    previous: Vec<EdgeFrame>,
    seen: HashSet<String>,
    pending: Option<(Instant, HashSet<String>)>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(&ViewportConfig::default())
    }
}

impl Reconciler {
    pub fn new(config: &ViewportConfig) -> Self {
        Self {
            curve: Curve::default(),
            debounce: Duration::from_millis(config.animation_debounce_ms),
            minimap_margin: config.minimap.map(|m| m.margin),
            previous: Vec::new(),
            seen: HashSet::new(),
            pending: None,
        }
    }

    pub fn with_curve(mut self, curve: Curve) -> Self {
        self.curve = curve;
        self
    }

    pub fn set_minimap_margin(&mut self, margin: Option<f64>) {
        self.minimap_margin = margin;
    }

    /// Edges of the last applied frame.
    pub fn previous_edges(&self) -> &[EdgeFrame] {
        &self.previous
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Promotes the ids of the latest frame to "seen before" once the
    /// debounce delay has passed since it was applied.
    pub fn advance(&mut self, now: Instant) {
        let due = self.pending.as_ref().is_some_and(|(at, _)| now >= *at);
        if due {
            if let Some((_, ids)) = self.pending.take() {
                tracing::trace!(count = ids.len(), "promoting seen nodes");
                self.seen = ids;
            }
        }
    }

    /// Forgets the previous frame and every seen node.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.seen.clear();
        self.pending = None;
    }

    /// Builds the frame for one layout emission. Emissions must be applied
    /// in the order the layout produced them.
    pub fn apply(&mut self, graph: &Graph, multigraph: bool, now: Instant) -> Frame {
        self.advance(now);

        let nodes: Vec<NodeFrame> = graph.nodes.iter().map(|n| self.node_frame(n)).collect();
        let clusters: Vec<NodeFrame> = graph.clusters.iter().map(|c| self.node_frame(&c.node)).collect();
        let ids = nodes.iter().chain(&clusters).map(|n| n.id.clone()).collect();
        self.pending = Some((now + self.debounce, ids));

        let edges: Vec<EdgeFrame> = graph
            .edge_labels
            .iter()
            .filter_map(|(key, label)| self.edge_frame(graph, key, label, multigraph))
            .collect();
        self.previous = edges.clone();

        let mut bounds = GraphBounds::of_nodes(&graph.nodes);
        if let Some(margin) = self.minimap_margin {
            bounds = bounds.expand(margin);
        }
        tracing::trace!(
            nodes = nodes.len(),
            edges = edges.len(),
            width = bounds.width(),
            height = bounds.height(),
            "frame reconciled"
        );
        Frame {
            nodes,
            clusters,
            edges,
            bounds,
        }
    }

    fn node_frame(&self, node: &Node) -> NodeFrame {
        let position = node.position_or_origin();
        let dimension = node.dimension.unwrap_or_default();
        NodeFrame {
            id: node.id.clone(),
            label: node.label.clone(),
            position,
            dimension,
            transform: translate(Point::new(
                position.x - dimension.width / 2.0,
                position.y - dimension.height / 2.0,
            )),
            animate: self.seen.contains(&node.id),
            data: node.data.clone(),
        }
    }

    fn edge_frame(&self, graph: &Graph, key: &EdgeKey, label: &EdgeLabel, multigraph: bool) -> Option<EdgeFrame> {
        if label.points.is_empty() {
            tracing::trace!(edge = %key, "skipping edge without points");
            return None;
        }
        let fresh = graph
            .edges
            .iter()
            .find(|e| key.matches(&e.source, &e.target, e.id.as_deref(), multigraph));
        let previous = self
            .previous
            .iter()
            .find(|e| key.matches(&e.source, &e.target, Some(&e.id), multigraph));

        let (id, text, data) = match (previous, fresh) {
            (Some(old), Some(new)) if old.data != new.data => payload(new),
            (Some(old), _) => (old.id.clone(), old.label.clone(), old.data.clone()),
            (None, Some(new)) => payload(new),
            (None, None) => (
                key.name
                    .clone()
                    .unwrap_or_else(|| format!("{}-{}", key.source, key.target)),
                None,
                serde_json::Value::Null,
            ),
        };

        let points = label.points.clone();
        let path = line(&points, self.curve);
        let (text_path, dominant_baseline) = text_direction(&points, self.curve);
        let mid_point = mid_point(&points);
        let text_transform = translate(points[points.len() / 2]);
        Some(EdgeFrame {
            id,
            source: key.source.clone(),
            target: key.target.clone(),
            label: text,
            data,
            old_line: previous.map_or_else(|| path.clone(), |old| old.line.clone()),
            old_text_path: previous.map_or_else(|| text_path.clone(), |old| old.text_path.clone()),
            points,
            line: path,
            text_path,
            mid_point,
            text_transform,
            dominant_baseline,
        })
    }
}

fn payload(edge: &Edge) -> (String, Option<String>, serde_json::Value) {
    (edge.id_str().to_string(), edge.label.clone(), edge.data.clone())
}

fn translate(p: Point) -> String {
    format!("translate({},{})", fmt_num(p.x), fmt_num(p.y))
}

/// Center point of an odd-length path; mean of the two central points of
/// an even-length one. `points` must not be empty.
pub fn mid_point(points: &[Point]) -> Point {
    let half = points.len() / 2;
    if points.len() % 2 == 1 {
        points[half]
    } else {
        points[half - 1].midpoint(&points[half])
    }
}

/// Label path and baseline: edges running right to left get the reversed
/// path with the text above it.
fn text_direction(points: &[Point], curve: Curve) -> (String, DominantBaseline) {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if last.x < first.x => {
            let reversed: Vec<Point> = points.iter().rev().copied().collect();
            (line(&reversed, curve), DominantBaseline::TextBeforeEdge)
        }
        _ => (line(points, curve), DominantBaseline::TextAfterEdge),
    }
}
