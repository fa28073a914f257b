//! Vehicle labels, label assignments and method tags.

use std::collections::HashMap;
use std::fmt;

use crate::graph::{Edge, NodeId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Vehicle a detection is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Label {
    #[default]
    Vehicle0,
    Vehicle1,
}

impl Label {
    /// Both labels, in index order.
    pub const ALL: [Label; 2] = [Label::Vehicle0, Label::Vehicle1];

    /// The other vehicle.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Vehicle0 => Self::Vehicle1,
            Self::Vehicle1 => Self::Vehicle0,
        }
    }

    /// Numeric index (0 or 1).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Vehicle0 => 0,
            Self::Vehicle1 => 1,
        }
    }
}

/// How a day's labels were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Method {
    /// One pair: its endpoints go to different vehicles.
    ManualSinglePair,
    /// Two pairs sharing a middle detection (A–B, B–C).
    TwoPairsChain,
    /// Chronological greedy assignment.
    GreedyTemporalFeasible,
    /// Spatial 2-means followed by local-search repair.
    SpatialKMeansRepair,
}

impl Method {
    /// Stable name used in logs and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManualSinglePair => "ManualSinglePair",
            Self::TwoPairsChain => "TwoPairsChain",
            Self::GreedyTemporalFeasible => "GreedyTemporalFeasible",
            Self::SpatialKMeansRepair => "SpatialKMeansRepair",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from node to vehicle label.
///
/// Each node holds at most one label; inserting again replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    labels: HashMap<NodeId, Label>,
}

impl Assignment {
    /// Creates an empty assignment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty assignment with room for `capacity` nodes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            labels: HashMap::with_capacity(capacity),
        }
    }

    /// Sets the label of a node, returning the previous one.
    pub fn insert(&mut self, node: NodeId, label: Label) -> Option<Label> {
        self.labels.insert(node, label)
    }

    /// Label of a node, if assigned.
    #[must_use]
    pub fn get(&self, node: &NodeId) -> Option<Label> {
        self.labels.get(node).copied()
    }

    /// Label of a node, treating unassigned nodes as [`Label::Vehicle0`].
    #[must_use]
    pub fn label_or_default(&self, node: &NodeId) -> Label {
        self.get(node).unwrap_or_default()
    }

    /// Flips the label of an assigned node. Returns false if unassigned.
    pub fn flip(&mut self, node: &NodeId) -> bool {
        match self.labels.get_mut(node) {
            Some(label) => {
                *label = label.opposite();
                true
            }
            None => false,
        }
    }

    /// Number of labelled nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if no node is labelled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterates over `(node, label)` entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, Label)> {
        self.labels.iter().map(|(node, label)| (node, *label))
    }

    /// Counts edges whose endpoints share a label.
    #[must_use]
    pub fn violations(&self, edges: &[Edge]) -> usize {
        edges
            .iter()
            .filter(|edge| {
                self.label_or_default(&edge.origin) == self.label_or_default(&edge.destination)
            })
            .count()
    }
}

impl FromIterator<(NodeId, Label)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (NodeId, Label)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Side;
    use chrono::{TimeZone, Utc};

    fn id(pair: usize, side: Side) -> NodeId {
        let ts = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();
        NodeId::new(ts, 0.0, 0.0, pair, side)
    }

    fn edge(pair: usize) -> Edge {
        Edge {
            origin: id(pair, Side::A),
            destination: id(pair, Side::B),
            distance_km: None,
            elapsed_s: None,
            speed_kmh: None,
        }
    }

    #[test]
    fn test_label_opposite() {
        assert_eq!(Label::Vehicle0.opposite(), Label::Vehicle1);
        assert_eq!(Label::Vehicle1.opposite(), Label::Vehicle0);
        assert_eq!(Label::Vehicle1.index(), 1);
        assert_eq!(Label::default(), Label::Vehicle0);
    }

    #[test]
    fn test_assignment_replaces() {
        let mut labels = Assignment::new();
        assert!(labels.insert(id(0, Side::A), Label::Vehicle0).is_none());
        assert_eq!(
            labels.insert(id(0, Side::A), Label::Vehicle1),
            Some(Label::Vehicle0)
        );
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get(&id(0, Side::A)), Some(Label::Vehicle1));
    }

    #[test]
    fn test_flip() {
        let mut labels = Assignment::new();
        labels.insert(id(0, Side::A), Label::Vehicle0);
        assert!(labels.flip(&id(0, Side::A)));
        assert_eq!(labels.get(&id(0, Side::A)), Some(Label::Vehicle1));
        assert!(!labels.flip(&id(0, Side::B)));
    }

    #[test]
    fn test_violations() {
        let edges = vec![edge(0), edge(1)];
        let labels: Assignment = [
            (id(0, Side::A), Label::Vehicle0),
            (id(0, Side::B), Label::Vehicle1),
            (id(1, Side::A), Label::Vehicle1),
            (id(1, Side::B), Label::Vehicle1),
        ]
        .into_iter()
        .collect();
        assert_eq!(labels.violations(&edges), 1);
    }

    #[test]
    fn test_unassigned_counts_as_vehicle0() {
        let edges = vec![edge(0)];
        let mut labels = Assignment::new();
        assert_eq!(labels.violations(&edges), 1);
        labels.insert(id(0, Side::B), Label::Vehicle1);
        assert_eq!(labels.violations(&edges), 0);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::TwoPairsChain.to_string(), "TwoPairsChain");
        assert_eq!(
            Method::GreedyTemporalFeasible.as_str(),
            "GreedyTemporalFeasible"
        );
    }
}
