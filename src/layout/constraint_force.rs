use std::collections::HashMap;
use std::fmt;

use crate::config::ConstraintSettings;
use crate::geometry::{Dimension, Point, Rect};
use crate::graph::{Edge, EdgeLabel, Graph};

use super::Stepper;
use super::constraint::{ConstraintGroup, ConstraintLink, ConstraintNode, ConstraintSolver};
use super::error::LayoutError;
use super::force::FORCE_NODE_SIZE;

/// Applied once to a freshly configured solver, right before it starts.
pub type ForceModifier = Box<dyn FnMut(&mut ConstraintSolver)>;
/// Called with the solver state before every emitted tick.
pub type TickListener = Box<dyn FnMut(&ConstraintSolver)>;

/// Group-aware constraint layout: clusters become solver groups that
/// enclose their members, and sibling rectangles are kept apart.
#[derive(Default)]
pub struct ConstraintForceLayout {
    pub settings: ConstraintSettings,
    pub force_modifier: Option<ForceModifier>,
    pub on_tick: Option<TickListener>,
    run: Option<ConstraintRun>,
}

impl fmt::Debug for ConstraintForceLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintForceLayout")
            .field("settings", &self.settings)
            .field("force_modifier", &self.force_modifier.is_some())
            .field("on_tick", &self.on_tick.is_some())
            .field("started", &self.run.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct ConstraintRun {
    graph: Graph,
    nodes: HashMap<String, usize>,
    groups: HashMap<String, usize>,
    solver: ConstraintSolver,
    drag_offsets: HashMap<usize, Point>,
    emitted: usize,
}

/// Where an edge end attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Node(usize),
    Group(usize),
}

impl ConstraintForceLayout {
    pub fn new(settings: ConstraintSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn with_force_modifier(mut self, modifier: impl FnMut(&mut ConstraintSolver) + 'static) -> Self {
        self.force_modifier = Some(Box::new(modifier));
        self
    }

    pub fn with_tick_listener(mut self, listener: impl FnMut(&ConstraintSolver) + 'static) -> Self {
        self.on_tick = Some(Box::new(listener));
        self
    }

    /// Resets all state, builds solver nodes, groups and links from `graph`
    /// and starts the solver.
    pub fn start(&mut self, mut graph: Graph) {
        graph.assign_missing_edge_ids();
        let nodes: HashMap<String, usize> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.clone(), idx))
            .collect();
        let groups: HashMap<String, usize> = graph
            .clusters
            .iter()
            .enumerate()
            .map(|(idx, cluster)| (cluster.id().to_string(), idx))
            .collect();

        let mut solver = ConstraintSolver::new(&self.settings);
        solver.set_nodes(
            graph
                .nodes
                .iter()
                .map(|node| {
                    let size = node.resolved_dimension(FORCE_NODE_SIZE);
                    let solver_node = ConstraintNode::new(size.width, size.height);
                    match node.position {
                        Some(p) => solver_node.with_position(p),
                        None => solver_node,
                    }
                })
                .collect(),
        );
        solver.set_groups(
            graph
                .clusters
                .iter()
                .map(|cluster| ConstraintGroup {
                    leaves: cluster.child_node_ids.iter().filter_map(|id| nodes.get(id).copied()).collect(),
                    groups: cluster.child_node_ids.iter().filter_map(|id| groups.get(id).copied()).collect(),
                    padding: self.settings.group_padding,
                    bounds: None,
                })
                .collect(),
        );
        graph.edges = resolvable_edges(std::mem::take(&mut graph.edges), &nodes, &groups);
        solver.set_links(node_links(&graph.edges, &nodes));
        solver.set_size(self.settings.view_dimensions);
        if let Some(modifier) = self.force_modifier.as_mut() {
            modifier(&mut solver);
        }
        solver.start(self.settings.alpha);
        tracing::debug!(
            nodes = solver.nodes().len(),
            groups = solver.groups().len(),
            links = solver.links().len(),
            "constraint solver started"
        );

        self.run = Some(ConstraintRun {
            graph,
            nodes,
            groups,
            solver,
            drag_offsets: HashMap::new(),
            emitted: 0,
        });
    }

    pub fn is_started(&self) -> bool {
        self.run.is_some()
    }

    /// Takes the edge list of `graph`, re-links the solver and restarts it.
    /// Placed nodes keep their positions.
    pub fn update_edge(&mut self, mut graph: Graph, edge_id: &str) -> Result<(), LayoutError> {
        if graph.edge(edge_id).is_none() {
            return Err(LayoutError::UnknownEdge(edge_id.to_string()));
        }
        let Some(run) = self.run.as_mut() else {
            self.start(graph);
            return Ok(());
        };
        graph.assign_missing_edge_ids();
        run.graph.edges = resolvable_edges(graph.edges, &run.nodes, &run.groups);
        run.solver.set_links(node_links(&run.graph.edges, &run.nodes));
        run.solver.start(self.settings.alpha);
        run.emitted = 0;
        Ok(())
    }

    pub fn on_drag_start(&mut self, node_id: &str, pointer: Point) {
        let Some((run, idx)) = self.drag_target(node_id) else {
            return;
        };
        let Some(node) = run.solver.nodes().get(idx).map(ConstraintNode::position) else {
            return;
        };
        run.drag_offsets
            .insert(idx, Point::new(node.x - pointer.x, node.y - pointer.y));
        run.solver.drag_start(idx);
        run.emitted = 0;
    }

    pub fn on_drag(&mut self, node_id: &str, pointer: Point) {
        let Some((run, idx)) = self.drag_target(node_id) else {
            return;
        };
        let offset = run.drag_offsets.get(&idx).copied().unwrap_or_default();
        run.solver
            .drag_to(idx, Point::new(pointer.x + offset.x, pointer.y + offset.y));
    }

    pub fn on_drag_end(&mut self, node_id: &str, _pointer: Point) {
        let Some((run, idx)) = self.drag_target(node_id) else {
            return;
        };
        run.drag_offsets.remove(&idx);
        run.solver.drag_end(idx);
    }

    fn drag_target(&mut self, node_id: &str) -> Option<(&mut ConstraintRun, usize)> {
        let run = self.run.as_mut()?;
        match run.nodes.get(node_id).copied() {
            Some(idx) => Some((run, idx)),
            None => {
                tracing::debug!(node = node_id, "ignoring drag of unknown node");
                None
            }
        }
    }

    pub fn dispose(&mut self) {
        if let Some(mut run) = self.run.take() {
            run.solver.stop();
            tracing::debug!(ticks = run.emitted, "constraint layout disposed");
        }
    }
}

impl Stepper for ConstraintForceLayout {
    fn step(&mut self) -> Option<Graph> {
        let max_ticks = self.settings.max_ticks;
        let run = self.run.as_mut()?;
        if max_ticks > 0 && run.emitted >= max_ticks {
            run.solver.stop();
        }
        if !run.solver.tick() {
            tracing::debug!(alpha = run.solver.alpha(), "constraint solver settled");
            return None;
        }
        if let Some(listener) = self.on_tick.as_mut() {
            listener(&run.solver);
        }
        run.emitted += 1;
        Some(run.snapshot())
    }
}

impl ConstraintRun {
    fn snapshot(&self) -> Graph {
        let mut graph = self.graph.clone();
        for (node, placed) in graph.nodes.iter_mut().zip(self.solver.nodes()) {
            node.position = Some(placed.position());
            node.dimension = Some(node.resolved_dimension(FORCE_NODE_SIZE));
        }
        for (cluster, group) in graph.clusters.iter_mut().zip(self.solver.groups()) {
            let rect = group_rect(group);
            cluster.node.position = Some(rect.center());
            cluster.node.dimension = Some(Dimension::new(rect.width, rect.height));
        }
        for edge in &mut graph.edges {
            let (Some(source), Some(target)) = (self.end(&edge.source), self.end(&edge.target)) else {
                continue;
            };
            let (s, t) = (self.end_rect(source), self.end_rect(target));
            edge.points = vec![attach_point(&s, t.center()), attach_point(&t, s.center())];
        }
        graph.edge_labels = graph
            .edges
            .iter()
            .map(|edge| {
                let key = edge.key(true);
                let label = EdgeLabel::new(&key, edge.points.clone());
                (key, label)
            })
            .collect();
        graph
    }

    fn end(&self, id: &str) -> Option<End> {
        resolve_end(id, &self.nodes, &self.groups)
    }

    fn end_rect(&self, end: End) -> Rect {
        match end {
            End::Node(idx) => self.solver.nodes()[idx].bounds(),
            End::Group(idx) => group_rect(&self.solver.groups()[idx]),
        }
    }
}

fn resolve_end(id: &str, nodes: &HashMap<String, usize>, groups: &HashMap<String, usize>) -> Option<End> {
    nodes
        .get(id)
        .map(|idx| End::Node(*idx))
        .or_else(|| groups.get(id).map(|idx| End::Group(*idx)))
}

/// Group bounds, or a default-sized box at the origin before the first tick.
fn group_rect(group: &ConstraintGroup) -> Rect {
    group
        .bounds
        .unwrap_or_else(|| Rect::from_center(Point::default(), FORCE_NODE_SIZE))
}

/// Where the ray from the rectangle's center toward `toward` leaves it;
/// the center itself when `toward` lies inside.
fn attach_point(rect: &Rect, toward: Point) -> Point {
    rect.ray_intersection(toward.x, toward.y)
        .unwrap_or_else(|| rect.center())
}

/// Keeps edges whose ends both resolve to a node or a cluster.
fn resolvable_edges(edges: Vec<Edge>, nodes: &HashMap<String, usize>, groups: &HashMap<String, usize>) -> Vec<Edge> {
    edges
        .into_iter()
        .filter(|edge| {
            let known = resolve_end(&edge.source, nodes, groups).is_some()
                && resolve_end(&edge.target, nodes, groups).is_some();
            if !known {
                tracing::warn!(
                    edge = edge.id_str(),
                    source = %edge.source,
                    target = %edge.target,
                    "dropping edge with unknown endpoint"
                );
            }
            known
        })
        .collect()
}

/// Solver links for the edges joining two plain nodes; edges touching a
/// cluster are routed but exert no force.
fn node_links(edges: &[Edge], nodes: &HashMap<String, usize>) -> Vec<ConstraintLink> {
    edges
        .iter()
        .filter_map(|edge| {
            Some(ConstraintLink {
                source: *nodes.get(&edge.source)?,
                target: *nodes.get(&edge.target)?,
            })
        })
        .collect()
}
