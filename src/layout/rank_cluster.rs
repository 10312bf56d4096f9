use std::collections::BTreeMap;

use crate::config::RankSettings;
use crate::graph::{EdgeLabel, Graph};

use super::error::LayoutError;
use super::rank::{
    copy_back, engine_for, engine_node, labels_from, prepare, register_edges, route_all, route_one, run_engine,
};

/// Hierarchical layout with clusters registered as compound nodes, so each
/// cluster comes back sized to enclose its children.
#[derive(Debug, Clone, Default)]
pub struct RankClusterLayout {
    pub settings: RankSettings,
}

impl RankClusterLayout {
    pub fn new(settings: RankSettings) -> Self {
        Self { settings }
    }

    pub fn run(&self, mut graph: Graph) -> Result<Graph, LayoutError> {
        prepare(&mut graph, true)?;
        let mut engine = engine_for(&graph, &self.settings);
        for cluster in &graph.clusters {
            engine.set_node(cluster.node.id.clone(), Some(engine_node(&cluster.node)));
        }
        let parents = if self.settings.compound {
            cluster_parents(&graph)?
        } else {
            BTreeMap::new()
        };
        for (child, parent) in &parents {
            let _ = engine.set_parent(child, Some(parent.clone()));
        }

        // dagre sizes a cluster from its children; edges ending on one only
        // get the local straight route.
        let is_compound = |id: &str| parents.values().any(|parent| parent == id);
        let delegated = graph
            .edges
            .iter()
            .filter(|edge| !is_compound(&edge.source) && !is_compound(&edge.target));
        register_edges(&mut engine, delegated, self.settings.multigraph);
        run_engine(&mut engine, graph.nodes.len() + graph.clusters.len());

        for node in &mut graph.nodes {
            copy_back(node, &engine);
        }
        for cluster in &mut graph.clusters {
            copy_back(&mut cluster.node, &engine);
        }
        graph.edge_labels = labels_from(&engine);
        route_all(&mut graph, true)?;
        for edge in &graph.edges {
            if is_compound(&edge.source) || is_compound(&edge.target) {
                let key = edge.key(self.settings.multigraph);
                let label = EdgeLabel::new(&key, edge.points.clone());
                graph.edge_labels.insert(key, label);
            }
        }
        Ok(graph)
    }

    pub fn update_edge(&self, mut graph: Graph, edge_id: &str) -> Result<Graph, LayoutError> {
        route_one(&mut graph, edge_id, true)?;
        Ok(graph)
    }
}

/// Child to parent map of the cluster tree. Unknown children are skipped; a
/// child listed by several clusters ends up under the last one.
fn cluster_parents(graph: &Graph) -> Result<BTreeMap<String, String>, LayoutError> {
    let mut parents: BTreeMap<String, String> = BTreeMap::new();
    for cluster in &graph.clusters {
        for child in &cluster.child_node_ids {
            if graph.any_node(child).is_none() {
                tracing::debug!(cluster = cluster.id(), child = %child, "skipping unknown cluster child");
                continue;
            }
            let mut ancestor = Some(cluster.id());
            while let Some(id) = ancestor {
                if id == child {
                    return Err(LayoutError::ClusterCycle {
                        child: child.clone(),
                        cluster: cluster.id().to_string(),
                    });
                }
                ancestor = parents.get(id).map(String::as_str);
            }
            parents.insert(child.clone(), cluster.id().to_string());
        }
    }
    Ok(parents)
}
