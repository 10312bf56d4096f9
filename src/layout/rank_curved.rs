use crate::config::{Orientation, RankSettings};
use crate::geometry::Point;
use crate::graph::{EdgeLabel, Graph, Node};

use super::error::LayoutError;
use super::rank::{RANK_NODE_SIZE, copy_back, endpoints, engine_for, prepare, register_edges, run_engine};

/// Hierarchical node placement with locally computed curved routes. Edges
/// only constrain ranking; every route is rebuilt from the placed nodes.
#[derive(Debug, Clone, Default)]
pub struct RankCurvedLayout {
    pub settings: RankSettings,
}

impl RankCurvedLayout {
    pub fn new(settings: RankSettings) -> Self {
        Self { settings }
    }

    pub fn run(&self, mut graph: Graph) -> Result<Graph, LayoutError> {
        prepare(&mut graph, false)?;
        let mut engine = engine_for(&graph, &self.settings);
        register_edges(&mut engine, &graph.edges, self.settings.multigraph);
        run_engine(&mut engine, graph.nodes.len());

        for node in &mut graph.nodes {
            copy_back(node, &engine);
        }
        graph.edge_labels.clear();
        for idx in 0..graph.edges.len() {
            self.route(&mut graph, idx)?;
        }
        Ok(graph)
    }

    pub fn update_edge(&self, mut graph: Graph, edge_id: &str) -> Result<Graph, LayoutError> {
        let idx = graph
            .edges
            .iter()
            .position(|e| e.id.as_deref() == Some(edge_id))
            .ok_or_else(|| LayoutError::UnknownEdge(edge_id.to_string()))?;
        self.route(&mut graph, idx)?;
        Ok(graph)
    }

    /// Writes the curved route of one edge into the edge and its label. In a
    /// multigraph the label is keyed by edge id, so parallel edges keep
    /// separate routes.
    fn route(&self, graph: &mut Graph, idx: usize) -> Result<(), LayoutError> {
        let edge = &graph.edges[idx];
        let (source, target) = endpoints(graph, edge, false)?;
        let points = curved_route(source, target, self.settings.orientation, self.settings.curve_distance);
        let key = edge.key(self.settings.multigraph);
        graph.edge_labels.insert(key.clone(), EdgeLabel::new(&key, points.clone()));
        graph.edges[idx].points = points;
        Ok(())
    }
}

/// Four-point route: both border points plus a control point
/// `curve_distance` beyond each of them along the rank axis.
pub(super) fn curved_route(source: &Node, target: &Node, orientation: Orientation, curve_distance: f64) -> Vec<Point> {
    let (sp, tp) = (source.position_or_origin(), target.position_or_origin());
    let (sd, td) = (
        source.resolved_dimension(RANK_NODE_SIZE),
        target.resolved_dimension(RANK_NODE_SIZE),
    );
    // (rank, order) coordinates and the rank-axis extent of each node
    let (s, t, s_extent, t_extent) = if orientation.is_vertical() {
        ((sp.y, sp.x), (tp.y, tp.x), sd.height, td.height)
    } else {
        ((sp.x, sp.y), (tp.x, tp.y), sd.width, td.width)
    };
    let dir = if s.0 <= t.0 { -1.0 } else { 1.0 };
    let start = (s.0 - dir * s_extent / 2.0, s.1);
    let end = (t.0 + dir * t_extent / 2.0, t.1);
    let route = [
        start,
        (start.0 - dir * curve_distance, start.1),
        (end.0 + dir * curve_distance, end.1),
        end,
    ];
    route
        .iter()
        .map(|&(rank, order)| {
            if orientation.is_vertical() {
                Point::new(order, rank)
            } else {
                Point::new(rank, order)
            }
        })
        .collect()
}
