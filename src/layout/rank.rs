use std::collections::BTreeMap;

use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};

use crate::config::{Acyclicer, Align, Orientation, RankSettings, Ranker};
use crate::geometry::{Dimension, Point};
use crate::graph::{Edge, EdgeKey, EdgeLabel, Graph, Node};

use super::error::LayoutError;

/// Size given to rank-family nodes that arrive without one.
pub(super) const RANK_NODE_SIZE: Dimension = Dimension::new(20.0, 30.0);

pub(super) type Engine = DagreGraph<DagreConfig, DagreNode, DagreEdge>;

/// Hierarchical layout: one dagre pass, straight edge routes between the
/// placed nodes.
#[derive(Debug, Clone, Default)]
pub struct RankLayout {
    pub settings: RankSettings,
}

impl RankLayout {
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
        graph.edge_labels = labels_from(&engine);
        route_all(&mut graph, false)?;
        tracing::trace!(nodes = graph.nodes.len(), labels = graph.edge_labels.len(), "rank layout done");
        Ok(graph)
    }

    pub fn update_edge(&self, mut graph: Graph, edge_id: &str) -> Result<Graph, LayoutError> {
        route_one(&mut graph, edge_id, false)?;
        Ok(graph)
    }
}

/// Fills ids and sizes, then checks that every edge endpoint exists.
/// Clusters count as endpoints only when `clusters` is set.
pub(super) fn prepare(graph: &mut Graph, clusters: bool) -> Result<(), LayoutError> {
    graph.assign_missing_edge_ids();
    for node in &mut graph.nodes {
        node.dimension = Some(node.resolved_dimension(RANK_NODE_SIZE));
    }
    if clusters {
        for cluster in &mut graph.clusters {
            cluster.node.dimension = Some(cluster.node.resolved_dimension(RANK_NODE_SIZE));
        }
    }
    for edge in &graph.edges {
        for endpoint in [&edge.source, &edge.target] {
            if endpoint_of(graph, endpoint, clusters).is_none() {
                return Err(LayoutError::MissingNode {
                    edge: edge.id_str().to_string(),
                    node: endpoint.clone(),
                });
            }
        }
    }
    Ok(())
}

fn endpoint_of<'g>(graph: &'g Graph, id: &str, clusters: bool) -> Option<&'g Node> {
    if clusters {
        graph.any_node(id)
    } else {
        graph.node(id)
    }
}

/// Builds the dagre graph with one node per graph node.
pub(super) fn engine_for(graph: &Graph, settings: &RankSettings) -> Engine {
    let mut engine: Engine = DagreGraph::new(Some(GraphOption {
        directed: Some(true),
        multigraph: Some(settings.multigraph),
        compound: Some(settings.compound),
    }));

    let mut config = DagreConfig::default();
    config.rankdir = Some(dagre_rankdir(settings.orientation).to_string());
    config.nodesep = Some(settings.node_padding as f32);
    config.edgesep = Some(settings.edge_padding as f32);
    config.ranksep = Some(settings.rank_padding as f32);
    config.marginx = Some(settings.margin_x as f32);
    config.marginy = Some(settings.margin_y as f32);
    config.align = settings.align.map(|align| dagre_align(align).to_string());
    config.acyclicer = settings.acyclicer.map(|acyclicer| dagre_acyclicer(acyclicer).to_string());
    config.ranker = Some(dagre_ranker(settings.ranker).to_string());
    engine.set_graph(config);

    for node in &graph.nodes {
        engine.set_node(node.id.clone(), Some(engine_node(node)));
    }
    engine
}

pub(super) fn engine_node(node: &Node) -> DagreNode {
    let size = node.resolved_dimension(RANK_NODE_SIZE);
    let mut label = DagreNode::default();
    label.width = size.width as f32;
    label.height = size.height as f32;
    label
}

/// Registers edges under their label keys: named by edge id in a
/// multigraph, by endpoints alone otherwise.
pub(super) fn register_edges<'e>(engine: &mut Engine, edges: impl IntoIterator<Item = &'e Edge>, multigraph: bool) {
    for edge in edges {
        let name = if multigraph { edge.id.clone() } else { None };
        let _ = engine.set_edge(&edge.source, &edge.target, Some(DagreEdge::default()), name);
    }
}

/// Runs dagre unless there is nothing to place.
pub(super) fn run_engine(engine: &mut Engine, node_count: usize) {
    if node_count > 0 {
        dagre_layout::run_layout(engine);
    }
}

/// Takes center and size from the engine; forced sizes stay untouched.
pub(super) fn copy_back(node: &mut Node, engine: &Engine) {
    let Some(placed) = engine.node(&node.id) else {
        return;
    };
    node.position = Some(Point::new(f64::from(placed.x), f64::from(placed.y)));
    if !node.meta.force_dimensions {
        node.dimension = Some(Dimension::new(f64::from(placed.width), f64::from(placed.height)));
    }
}

pub(super) fn labels_from(engine: &Engine) -> BTreeMap<EdgeKey, EdgeLabel> {
    let mut labels = BTreeMap::new();
    for e in engine.edges() {
        let Some(edge) = engine.edge_with_obj(&e) else {
            continue;
        };
        let key = EdgeKey::new(&e.v, &e.w, e.name.as_deref());
        let points = edge
            .points
            .iter()
            .flatten()
            .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
            .collect();
        labels.insert(key.clone(), EdgeLabel::new(&key, points));
    }
    labels
}

fn dagre_rankdir(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::TopToBottom => "tb",
        Orientation::BottomToTop => "bt",
        Orientation::LeftToRight => "lr",
        Orientation::RightToLeft => "rl",
    }
}

fn dagre_align(align: Align) -> &'static str {
    match align {
        Align::UpLeft => "ul",
        Align::UpRight => "ur",
        Align::DownLeft => "dl",
        Align::DownRight => "dr",
    }
}

fn dagre_acyclicer(acyclicer: Acyclicer) -> &'static str {
    match acyclicer {
        Acyclicer::Greedy => "greedy",
    }
}

fn dagre_ranker(ranker: Ranker) -> &'static str {
    match ranker {
        Ranker::NetworkSimplex => "network-simplex",
        Ranker::TightTree => "tight-tree",
        Ranker::LongestPath => "longest-path",
    }
}

/// Two-point route leaving the source and entering the target through
/// the horizontal border facing the other node.
pub(super) fn straight_route(source: &Node, target: &Node) -> Vec<Point> {
    let (sp, tp) = (source.position_or_origin(), target.position_or_origin());
    let sh = source.resolved_dimension(RANK_NODE_SIZE).height;
    let th = target.resolved_dimension(RANK_NODE_SIZE).height;
    let dir = if sp.y <= tp.y { -1.0 } else { 1.0 };
    vec![
        Point::new(sp.x, sp.y - dir * sh / 2.0),
        Point::new(tp.x, tp.y + dir * th / 2.0),
    ]
}

pub(super) fn route_all(graph: &mut Graph, clusters: bool) -> Result<(), LayoutError> {
    let routes = graph
        .edges
        .iter()
        .map(|edge| {
            let (source, target) = endpoints(graph, edge, clusters)?;
            Ok(straight_route(source, target))
        })
        .collect::<Result<Vec<_>, LayoutError>>()?;
    for (edge, points) in graph.edges.iter_mut().zip(routes) {
        edge.points = points;
    }
    Ok(())
}

pub(super) fn route_one(graph: &mut Graph, edge_id: &str, clusters: bool) -> Result<(), LayoutError> {
    let idx = graph
        .edges
        .iter()
        .position(|e| e.id.as_deref() == Some(edge_id))
        .ok_or_else(|| LayoutError::UnknownEdge(edge_id.to_string()))?;
    let (source, target) = endpoints(graph, &graph.edges[idx], clusters)?;
    let points = straight_route(source, target);
    graph.edges[idx].points = points;
    Ok(())
}

pub(super) fn endpoints<'g>(
    graph: &'g Graph,
    edge: &Edge,
    clusters: bool,
) -> Result<(&'g Node, &'g Node), LayoutError> {
    let find = |id: &str| {
        endpoint_of(graph, id, clusters).ok_or_else(|| LayoutError::MissingNode {
            edge: edge.id_str().to_string(),
            node: id.to_string(),
        })
    };
    Ok((find(&edge.source)?, find(&edge.target)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Orientation;

    fn chain() -> Graph {
        let mut graph = Graph::new();
        graph
            .add_node(Node::new("a"))
            .add_node(Node::new("b").with_dimension(60.0, 40.0))
            .add_node(Node::new("c"))
            .add_edge(Edge::new("a", "b"))
            .add_edge(Edge::new("b", "c").with_id("bc"));
        graph
    }

    #[test]
    fn fills_default_sizes_and_positions() {
        let out = RankLayout::default().run(chain()).unwrap();
        let a = out.node("a").unwrap();
        assert_eq!(a.dimension, Some(RANK_NODE_SIZE));
        assert_eq!(out.node("b").unwrap().dimension, Some(Dimension::new(60.0, 40.0)));
        assert!(out.nodes.iter().all(|n| n.position.is_some_and(|p| p.is_finite())));
        // left to right by default
        assert!(out.node("a").unwrap().position.unwrap().x < out.node("c").unwrap().position.unwrap().x);
    }

    #[test]
    fn assigns_ids_and_routes_every_edge() {
        let out = RankLayout::default().run(chain()).unwrap();
        assert_eq!(out.edges[0].id.as_deref(), Some("e1"));
        assert_eq!(out.edges[1].id.as_deref(), Some("bc"));
        assert!(out.edges.iter().all(|e| e.points.len() == 2));
        assert_eq!(out.edge_labels.len(), 2);
        assert!(out.edge_labels.contains_key(&EdgeKey::new("b", "c", Some("bc"))));
    }

    #[test]
    fn dagre_places_ranks_and_routes_labels() {
        let settings = RankSettings {
            orientation: Orientation::TopToBottom,
            ..Default::default()
        };
        let out = RankLayout::new(settings).run(chain()).unwrap();
        let y = |id: &str| out.node(id).unwrap().position.unwrap().y;
        assert!(y("a") < y("b") && y("b") < y("c"));
        for label in out.edge_labels.values() {
            assert!(label.points.len() >= 2, "{label:?}");
            assert!(label.points.iter().all(Point::is_finite));
        }
    }

    #[test]
    fn empty_graph_skips_the_delegate() {
        let out = RankLayout::default().run(Graph::new()).unwrap();
        assert!(out.nodes.is_empty() && out.edge_labels.is_empty());
    }

    #[test]
    fn straight_route_leaves_through_facing_borders() {
        let source = Node::new("s").with_position(0.0, 0.0).with_dimension(10.0, 20.0);
        let target = Node::new("t").with_position(50.0, 100.0).with_dimension(10.0, 40.0);
        assert_eq!(
            straight_route(&source, &target),
            vec![Point::new(0.0, 10.0), Point::new(50.0, 80.0)]
        );
        assert_eq!(
            straight_route(&target, &source),
            vec![Point::new(50.0, 80.0), Point::new(0.0, 10.0)]
        );
    }

    #[test]
    fn dangling_edge_is_an_error() {
        let mut graph = chain();
        graph.add_edge(Edge::new("a", "ghost").with_id("bad"));
        let err = RankLayout::default().run(graph).unwrap_err();
        assert_eq!(
            err,
            LayoutError::MissingNode {
                edge: "bad".to_string(),
                node: "ghost".to_string()
            }
        );
    }

    #[test]
    fn forced_dimensions_survive() {
        let mut graph = chain();
        let node = graph.node_mut("a").unwrap();
        node.dimension = Some(Dimension::new(0.0, 12.0));
        node.meta.force_dimensions = true;
        let out = RankLayout::default().run(graph).unwrap();
        assert_eq!(out.node("a").unwrap().dimension, Some(Dimension::new(0.0, 12.0)));
    }

    #[test]
    fn update_edge_reroutes_after_a_move() {
        let settings = RankSettings {
            orientation: Orientation::TopToBottom,
            ..Default::default()
        };
        let layout = RankLayout::new(settings);
        let mut graph = layout.run(chain()).unwrap();
        graph.node_mut("c").unwrap().position = Some(Point::new(500.0, -500.0));
        let graph = layout.update_edge(graph, "bc").unwrap();
        let points = &graph.edge("bc").unwrap().points;
        // c now sits above b, so the route enters c through its bottom border
        assert_eq!(points[1], Point::new(500.0, -500.0 + 15.0));
        assert_eq!(
            layout.update_edge(graph, "nope").unwrap_err(),
            LayoutError::UnknownEdge("nope".to_string())
        );
    }
}
