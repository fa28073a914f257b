//! Exact labelling of two pairs forming a chain.
//!
//! Two pairs A–B and B–C that share the sighting B describe a three-point
//! chain. B's two detections go to one vehicle and A, C to the other.

use std::collections::HashMap;

use clonetrack_core::{Assignment, Edge, Label, NodeCore};

/// Handles the two-pair chain special case.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoPairsChainHandler;

impl TwoPairsChainHandler {
    /// Labels a two-edge chain.
    ///
    /// Returns `None` unless there are exactly two edges whose four
    /// endpoints resolve to exactly three distinct sightings.
    #[must_use]
    pub fn handle(edges: &[Edge]) -> Option<Assignment> {
        let [first, second] = edges else {
            return None;
        };
        let endpoints = [
            first.origin,
            first.destination,
            second.origin,
            second.destination,
        ];

        let mut counts: HashMap<NodeCore, usize> = HashMap::with_capacity(4);
        for id in &endpoints {
            *counts.entry(id.core).or_default() += 1;
        }
        if counts.len() != 3 {
            return None;
        }

        let middle = counts
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(core, _)| *core)?;

        Some(
            endpoints
                .into_iter()
                .map(|id| {
                    let label = if id.core == middle {
                        Label::Vehicle1
                    } else {
                        Label::Vehicle0
                    };
                    (id, label)
                })
                .collect(),
        )
    }
}
