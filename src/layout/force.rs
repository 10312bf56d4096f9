use std::collections::HashMap;

use crate::config::ForceSettings;
use crate::geometry::{Dimension, Point};
use crate::graph::{Edge, EdgeLabel, Graph};

use super::Stepper;
use super::error::LayoutError;
use super::simulation::Simulation;

/// Size given to force-family nodes that arrive without one.
pub(super) const FORCE_NODE_SIZE: Dimension = Dimension::new(20.0, 20.0);

/// Particle simulation layout. `start` captures a private working copy of
/// the graph; every tick emits a freshly built graph from the live particle
/// positions.
#[derive(Debug, Clone, Default)]
pub struct ForceLayout {
    pub settings: ForceSettings,
    run: Option<ForceRun>,
}

#[derive(Debug, Clone)]
struct ForceRun {
    graph: Graph,
    index: HashMap<String, usize>,
    simulation: Simulation,
    drag_offsets: HashMap<usize, Point>,
    emitted: usize,
}

impl ForceLayout {
    pub fn new(settings: ForceSettings) -> Self {
        Self { settings, run: None }
    }

    /// Resets all state and starts a fresh simulation over `graph`.
    pub fn start(&mut self, mut graph: Graph) {
        graph.assign_missing_edge_ids();
        let index: HashMap<String, usize> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.clone(), idx))
            .collect();
        graph.edges = linked_edges(std::mem::take(&mut graph.edges), &index);
        graph.clusters.clear();

        let mut simulation = Simulation::new(&self.settings);
        let seeds: Vec<Option<Point>> = graph.nodes.iter().map(|n| n.position).collect();
        simulation.set_nodes(&seeds);
        simulation.set_links(&link_pairs(&graph.edges, &index));
        simulation.set_alpha(self.settings.alpha);
        simulation.set_alpha_target(0.0);

        self.run = Some(ForceRun {
            graph,
            index,
            simulation,
            drag_offsets: HashMap::new(),
            emitted: 0,
        });
    }

    pub fn is_started(&self) -> bool {
        self.run.is_some()
    }

    /// Takes the edge list of `graph`, re-links the springs and re-heats
    /// the simulation. Starts a run when none is active.
    pub fn update_edge(&mut self, mut graph: Graph, edge_id: &str) -> Result<(), LayoutError> {
        if graph.edge(edge_id).is_none() {
            return Err(LayoutError::UnknownEdge(edge_id.to_string()));
        }
        let Some(run) = self.run.as_mut() else {
            self.start(graph);
            return Ok(());
        };
        graph.assign_missing_edge_ids();
        run.graph.edges = linked_edges(graph.edges, &run.index);
        run.simulation.set_links(&link_pairs(&run.graph.edges, &run.index));
        run.simulation.set_alpha(self.settings.alpha);
        run.simulation.restart();
        run.emitted = 0;
        Ok(())
    }

    pub fn on_drag_start(&mut self, node_id: &str, pointer: Point) {
        let target = self.settings.drag_alpha_target;
        let Some((run, idx)) = self.drag_target(node_id) else {
            return;
        };
        let Some(node) = run.simulation.node(idx).map(|n| n.position()) else {
            return;
        };
        run.simulation.set_alpha_target(target);
        run.simulation.restart();
        run.emitted = 0;
        let offset = Point::new(pointer.x - node.x, pointer.y - node.y);
        run.drag_offsets.insert(idx, offset);
        run.simulation.fix(idx, node.x, node.y);
    }

    pub fn on_drag(&mut self, node_id: &str, pointer: Point) {
        let Some((run, idx)) = self.drag_target(node_id) else {
            return;
        };
        let offset = run.drag_offsets.get(&idx).copied().unwrap_or_default();
        run.simulation.fix(idx, pointer.x - offset.x, pointer.y - offset.y);
    }

    pub fn on_drag_end(&mut self, node_id: &str, _pointer: Point) {
        let Some((run, idx)) = self.drag_target(node_id) else {
            return;
        };
        run.simulation.set_alpha_target(0.0);
        run.simulation.release(idx);
        run.drag_offsets.remove(&idx);
    }

    fn drag_target(&mut self, node_id: &str) -> Option<(&mut ForceRun, usize)> {
        let run = self.run.as_mut()?;
        match run.index.get(node_id).copied() {
            Some(idx) => Some((run, idx)),
            None => {
                tracing::debug!(node = node_id, "ignoring drag of unknown node");
                None
            }
        }
    }

    pub fn dispose(&mut self) {
        if let Some(mut run) = self.run.take() {
            run.simulation.stop();
            tracing::debug!(ticks = run.simulation.tick_count(), "force layout disposed");
        }
    }
}

impl Stepper for ForceLayout {
    fn step(&mut self) -> Option<Graph> {
        let max_ticks = self.settings.max_ticks;
        let run = self.run.as_mut()?;
        if max_ticks > 0 && run.emitted >= max_ticks {
            run.simulation.stop();
        }
        if !run.simulation.step() {
            tracing::debug!(ticks = run.simulation.tick_count(), "force simulation settled");
            return None;
        }
        run.emitted += 1;
        Some(run.snapshot())
    }
}

impl ForceRun {
    fn snapshot(&self) -> Graph {
        let mut graph = self.graph.clone();
        for (node, particle) in graph.nodes.iter_mut().zip(self.simulation.nodes()) {
            node.position = Some(particle.position());
            node.dimension = Some(node.resolved_dimension(FORCE_NODE_SIZE));
        }
        let positions: Vec<Point> = self.simulation.nodes().iter().map(|p| p.position()).collect();
        for edge in &mut graph.edges {
            let (Some(s), Some(t)) = (self.index.get(&edge.source), self.index.get(&edge.target)) else {
                continue;
            };
            edge.points = vec![positions[*s], positions[*t]];
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
}

/// Keeps the edges whose endpoints are both known nodes.
fn linked_edges(edges: Vec<Edge>, index: &HashMap<String, usize>) -> Vec<Edge> {
    edges
        .into_iter()
        .filter(|edge| {
            let known = index.contains_key(&edge.source) && index.contains_key(&edge.target);
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

fn link_pairs(edges: &[Edge], index: &HashMap<String, usize>) -> Vec<(usize, usize)> {
    edges
        .iter()
        .filter_map(|edge| Some((*index.get(&edge.source)?, *index.get(&edge.target)?)))
        .collect()
}
