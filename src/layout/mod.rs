//! Layout strategies and the engines behind them.
//!
//! Every strategy takes ownership of a [`Graph`] and produces a
//! [`LayoutResult`]: the rank family answers with one positioned snapshot,
//! the force family with a [`Ticks`] stream that yields a fresh graph per
//! simulation tick until the simulation cools down or is disposed.

mod constraint_force;
mod error;
mod force;
mod rank;
mod rank_cluster;
mod rank_curved;
mod rng;

pub mod constraint;
pub mod simulation;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;

use crate::config::LayoutSettings;
use crate::geometry::Point;
use crate::graph::Graph;

pub use constraint_force::{ConstraintForceLayout, ForceModifier, TickListener};
pub use error::LayoutError;
pub use force::ForceLayout;
pub use rank::RankLayout;
pub use rank_cluster::RankClusterLayout;
pub use rank_curved::RankCurvedLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LayoutKind {
    Rank,
    RankCluster,
    RankCurved,
    Force,
    ConstraintForce,
}

static REGISTRY: Lazy<BTreeMap<&'static str, LayoutKind>> = Lazy::new(|| {
    LayoutKind::ALL
        .iter()
        .map(|kind| (kind.name(), *kind))
        .collect()
});

impl LayoutKind {
    pub const ALL: [LayoutKind; 5] = [
        LayoutKind::Rank,
        LayoutKind::RankCluster,
        LayoutKind::RankCurved,
        LayoutKind::Force,
        LayoutKind::ConstraintForce,
    ];

    /// Registry name.
    pub fn name(self) -> &'static str {
        match self {
            LayoutKind::Rank => "rank",
            LayoutKind::RankCluster => "rank-cluster",
            LayoutKind::RankCurved => "rank-curved",
            LayoutKind::Force => "force",
            LayoutKind::ConstraintForce => "constraint-force",
        }
    }

    /// Whether runs of this kind produce a tick stream instead of one snapshot.
    pub fn is_streaming(self) -> bool {
        matches!(self, LayoutKind::Force | LayoutKind::ConstraintForce)
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutKind {
    type Err = LayoutError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        REGISTRY
            .get(name)
            .copied()
            .ok_or_else(|| LayoutError::UnknownLayout(name.to_string()))
    }
}

/// Creates a fresh strategy for a registry name. Strategies are never shared
/// between calls.
pub fn get_layout(name: &str, settings: &LayoutSettings) -> Result<Layout, LayoutError> {
    let kind: LayoutKind = name.parse()?;
    Ok(Layout::new(kind, settings))
}

/// Advances a streaming strategy by one tick.
pub(crate) trait Stepper {
    fn step(&mut self) -> Option<Graph>;
}

/// Tick stream of a running force strategy. Dropping it pauses the
/// strategy; [`Layout::ticks`] picks the stream up again.
pub struct Ticks<'a> {
    stepper: &'a mut dyn Stepper,
}

impl<'a> Ticks<'a> {
    pub(crate) fn new(stepper: &'a mut dyn Stepper) -> Self {
        Self { stepper }
    }
}

impl Iterator for Ticks<'_> {
    type Item = Graph;

    fn next(&mut self) -> Option<Graph> {
        self.stepper.step()
    }
}

impl fmt::Debug for Ticks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticks").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum LayoutResult<'a> {
    Snapshot(Graph),
    Stream(Ticks<'a>),
}

impl<'a> LayoutResult<'a> {
    pub fn is_stream(&self) -> bool {
        matches!(self, LayoutResult::Stream(_))
    }

    /// Treats both shapes as "zero or more snapshots over time".
    pub fn into_snapshots(self) -> Snapshots<'a> {
        match self {
            LayoutResult::Snapshot(graph) => Snapshots::Once(Some(graph)),
            LayoutResult::Stream(ticks) => Snapshots::Stream(ticks),
        }
    }
}

#[derive(Debug)]
pub enum Snapshots<'a> {
    Once(Option<Graph>),
    Stream(Ticks<'a>),
}

impl Iterator for Snapshots<'_> {
    type Item = Graph;

    fn next(&mut self) -> Option<Graph> {
        match self {
            Snapshots::Once(graph) => graph.take(),
            Snapshots::Stream(ticks) => ticks.next(),
        }
    }
}

#[derive(Debug)]
pub enum Layout {
    Rank(RankLayout),
    RankCluster(RankClusterLayout),
    RankCurved(RankCurvedLayout),
    Force(ForceLayout),
    ConstraintForce(ConstraintForceLayout),
}

impl Layout {
    pub fn new(kind: LayoutKind, settings: &LayoutSettings) -> Self {
        match kind {
            LayoutKind::Rank => Layout::Rank(RankLayout::new(settings.rank.clone())),
            LayoutKind::RankCluster => Layout::RankCluster(RankClusterLayout::new(settings.rank.clone())),
            LayoutKind::RankCurved => Layout::RankCurved(RankCurvedLayout::new(settings.rank.clone())),
            LayoutKind::Force => Layout::Force(ForceLayout::new(settings.force.clone())),
            LayoutKind::ConstraintForce => {
                Layout::ConstraintForce(ConstraintForceLayout::new(settings.constraint.clone()))
            }
        }
    }

    pub fn kind(&self) -> LayoutKind {
        match self {
            Layout::Rank(_) => LayoutKind::Rank,
            Layout::RankCluster(_) => LayoutKind::RankCluster,
            Layout::RankCurved(_) => LayoutKind::RankCurved,
            Layout::Force(_) => LayoutKind::Force,
            Layout::ConstraintForce(_) => LayoutKind::ConstraintForce,
        }
    }

    /// Whether edge labels are keyed by edge id as well as endpoints.
    pub fn is_multigraph(&self) -> bool {
        match self {
            Layout::Rank(layout) => layout.settings.multigraph,
            Layout::RankCluster(layout) => layout.settings.multigraph,
            Layout::RankCurved(layout) => layout.settings.multigraph,
            Layout::Force(_) | Layout::ConstraintForce(_) => true,
        }
    }

    pub fn run(&mut self, graph: Graph) -> Result<LayoutResult<'_>, LayoutError> {
        let kind = self.kind();
        let _span = tracing::debug_span!(
            "layout",
            layout = %kind,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            clusters = graph.clusters.len()
        )
        .entered();
        tracing::debug!("running layout");
        match self {
            Layout::Rank(layout) => layout.run(graph).map(LayoutResult::Snapshot),
            Layout::RankCluster(layout) => layout.run(graph).map(LayoutResult::Snapshot),
            Layout::RankCurved(layout) => layout.run(graph).map(LayoutResult::Snapshot),
            Layout::Force(layout) => {
                layout.start(graph);
                Ok(LayoutResult::Stream(Ticks::new(layout)))
            }
            Layout::ConstraintForce(layout) => {
                layout.start(graph);
                Ok(LayoutResult::Stream(Ticks::new(layout)))
            }
        }
    }

    /// Recomputes the route of one edge after its endpoints moved. The rank
    /// family answers with the updated graph; force strategies re-heat their
    /// simulation and answer with the resumed stream.
    pub fn update_edge(&mut self, graph: Graph, edge_id: &str) -> Result<LayoutResult<'_>, LayoutError> {
        match self {
            Layout::Rank(layout) => layout.update_edge(graph, edge_id).map(LayoutResult::Snapshot),
            Layout::RankCluster(layout) => layout.update_edge(graph, edge_id).map(LayoutResult::Snapshot),
            Layout::RankCurved(layout) => layout.update_edge(graph, edge_id).map(LayoutResult::Snapshot),
            Layout::Force(layout) => {
                layout.update_edge(graph, edge_id)?;
                Ok(LayoutResult::Stream(Ticks::new(layout)))
            }
            Layout::ConstraintForce(layout) => {
                layout.update_edge(graph, edge_id)?;
                Ok(LayoutResult::Stream(Ticks::new(layout)))
            }
        }
    }

    pub fn on_drag_start(&mut self, node_id: &str, pointer: Point) {
        match self {
            Layout::Force(layout) => layout.on_drag_start(node_id, pointer),
            Layout::ConstraintForce(layout) => layout.on_drag_start(node_id, pointer),
            _ => {}
        }
    }

    pub fn on_drag(&mut self, node_id: &str, pointer: Point) {
        match self {
            Layout::Force(layout) => layout.on_drag(node_id, pointer),
            Layout::ConstraintForce(layout) => layout.on_drag(node_id, pointer),
            _ => {}
        }
    }

    pub fn on_drag_end(&mut self, node_id: &str, pointer: Point) {
        match self {
            Layout::Force(layout) => layout.on_drag_end(node_id, pointer),
            Layout::ConstraintForce(layout) => layout.on_drag_end(node_id, pointer),
            _ => {}
        }
    }

    /// Resumes the tick stream of a running force strategy, e.g. after a
    /// drag re-heated it. `None` for the rank family or before `run`.
    pub fn ticks(&mut self) -> Option<Ticks<'_>> {
        match self {
            Layout::Force(layout) if layout.is_started() => Some(Ticks::new(layout)),
            Layout::ConstraintForce(layout) if layout.is_started() => Some(Ticks::new(layout)),
            _ => None,
        }
    }

    /// Stops any further ticks. A later `run` starts from scratch.
    pub fn dispose(&mut self) {
        match self {
            Layout::Force(layout) => layout.dispose(),
            Layout::ConstraintForce(layout) => layout.dispose(),
            _ => {}
        }
    }
}
