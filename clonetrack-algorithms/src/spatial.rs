//! Spatial 2-means clustering with local-search repair.

use clonetrack_core::config::DEFAULT_KMEANS_SEED;
use clonetrack_core::{Assignment, Edge, Graph, NodeId};

use crate::kmeans::two_means;

/// Spatial clustering: 2-means on (latitude, longitude), then single-node
/// flips that strictly reduce cannot-link violations.
#[derive(Debug, Clone)]
pub struct SpatialKMeansClustering {
    seed: u64,
}

/// Summary of a local-search repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepairStats {
    /// Violations of the initial 2-means labels.
    pub initial_violations: usize,
    /// Violations after repair.
    pub final_violations: usize,
    /// Full passes over the nodes, including the final pass without flips.
    pub passes: usize,
    /// Flips kept.
    pub flips: usize,
}

impl Default for SpatialKMeansClustering {
    fn default() -> Self {
        Self::new(DEFAULT_KMEANS_SEED)
    }
}

impl SpatialKMeansClustering {
    /// Creates a spatial clustering with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Labels every node of the graph.
    #[must_use]
    pub fn cluster(&self, graph: &Graph) -> Assignment {
        self.cluster_with_stats(graph).0
    }

    /// Labels every node and reports how the repair went.
    #[must_use]
    pub fn cluster_with_stats(&self, graph: &Graph) -> (Assignment, RepairStats) {
        let points: Vec<[f64; 2]> = graph
            .nodes()
            .iter()
            .map(|node| [node.latitude, node.longitude])
            .collect();
        let mut labels: Assignment = graph
            .nodes()
            .iter()
            .zip(two_means(&points, self.seed))
            .map(|(node, label)| (node.id, label))
            .collect();

        let stats = repair(graph, &mut labels);
        (labels, stats)
    }
}

/// Flips single labels while that strictly reduces violations.
///
/// Nodes are visited in graph order; passes repeat until one makes no flip.
/// Every kept flip lowers the violation count, so at most
/// `initial_violations + 1` passes run.
pub(crate) fn repair(graph: &Graph, labels: &mut Assignment) -> RepairStats {
    let edges = graph.edges();
    let initial = labels.violations(edges);
    let mut current = initial;
    let mut stats = RepairStats {
        initial_violations: initial,
        ..RepairStats::default()
    };

    let mut improved = true;
    while improved {
        improved = false;
        stats.passes += 1;
        for node in graph.nodes() {
            if try_flip(&node.id, labels, edges, current) {
                current = labels.violations(edges);
                stats.flips += 1;
                improved = true;
            }
        }
    }

    stats.final_violations = current;
    stats
}

fn try_flip(
    node: &NodeId,
    labels: &mut Assignment,
    edges: &[Edge],
    current: usize,
) -> bool {
    if !labels.flip(node) {
        return false;
    }
    if labels.violations(edges) < current {
        return true;
    }
    labels.flip(node);
    false
}
