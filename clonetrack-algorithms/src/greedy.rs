//! Chronological greedy two-vehicle assignment.
//!
//! Detections are visited in time order. Each vehicle keeps its most recent
//! detection (its "tail"); a detection joins the vehicle it can reach with
//! the lowest implied speed. A detection whose pair partner is already
//! labelled is forced onto the other vehicle.
#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;

use clonetrack_core::geo::haversine_km;
use clonetrack_core::{Assignment, Graph, Label, Node, NodeId};

/// Cost added to an infeasible move so any feasible move ranks ahead of it.
pub const INFEASIBLE_PENALTY: f64 = 1e6;

/// Greedy temporal clustering under a maximum-speed constraint.
#[derive(Debug, Clone)]
pub struct GreedyTemporalClustering {
    max_speed_kmh: f64,
}

/// Outcome of appending a detection to a vehicle's tail.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Move {
    feasible: bool,
    cost: f64,
}

impl Move {
    const NONE: Move = Move {
        feasible: false,
        cost: f64::INFINITY,
    };

    const FREE: Move = Move {
        feasible: true,
        cost: 0.0,
    };

    fn is_better_than(self, best: Move) -> bool {
        if self.feasible && (!best.feasible || self.cost < best.cost) {
            return true;
        }
        !best.feasible && self.cost < best.cost
    }
}

impl GreedyTemporalClustering {
    /// Creates a greedy clustering with the given speed limit (km/h).
    #[must_use]
    pub fn new(max_speed_kmh: f64) -> Self {
        Self { max_speed_kmh }
    }

    /// Labels every node of the graph in a single chronological pass.
    ///
    /// Partners are never given the same label; speed feasibility is best
    /// effort.
    #[must_use]
    pub fn cluster(&self, graph: &Graph) -> Assignment {
        let partners = graph.partner_map();
        let mut labels = Assignment::with_capacity(graph.nodes().len());
        let mut tails: [Option<&Node>; 2] = [None, None];

        for node in graph.nodes() {
            let label = forced_label(&node.id, &partners, &labels)
                .unwrap_or_else(|| self.best_label(node, &tails));
            labels.insert(node.id, label);
            tails[label.index()] = Some(node);
        }

        labels
    }

    fn best_label(&self, node: &Node, tails: &[Option<&Node>; 2]) -> Label {
        let mut best_label = None;
        let mut best = Move::NONE;

        for label in Label::ALL {
            let candidate = self.evaluate(tails[label.index()], node);
            if candidate.is_better_than(best) {
                best_label = Some(label);
                best = candidate;
            }
        }

        best_label.unwrap_or(Label::Vehicle0)
    }

    fn evaluate(&self, tail: Option<&Node>, node: &Node) -> Move {
        let Some(prev) = tail else {
            return Move::FREE;
        };

        let dt_s = (node.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
        if dt_s <= 0.0 {
            return Move::FREE;
        }

        let distance_km =
            haversine_km(prev.latitude, prev.longitude, node.latitude, node.longitude);
        let speed = distance_km / (dt_s / 3600.0);
        if speed <= self.max_speed_kmh {
            Move {
                feasible: true,
                cost: speed,
            }
        } else {
            Move {
                feasible: false,
                cost: speed + INFEASIBLE_PENALTY,
            }
        }
    }
}

fn forced_label(
    node: &NodeId,
    partners: &HashMap<NodeId, NodeId>,
    labels: &Assignment,
) -> Option<Label> {
    let partner = partners.get(node)?;
    labels.get(partner).map(Label::opposite)
}
