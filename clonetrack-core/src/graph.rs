//! Cannot-link constraint graph for one day of suspicious pairs.
//!
//! Every detection pair contributes two fresh nodes (one per side) and one
//! edge between them. An edge states that its endpoints must not be
//! attributed to the same vehicle.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use log::debug;

use crate::detection::{DetectionPairRow, Side};
use crate::geo::{haversine_km, implied_speed_kmh, micro_degrees};
use crate::time::parse_timestamp;
use crate::{Error, Result};

/// Position-and-time part of a node id, shared by detections of the same
/// physical sighting that appear in more than one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeCore {
    pub timestamp: DateTime<Utc>,
    /// Latitude rounded to 6 decimals, in micro-degrees.
    pub lat_e6: i64,
    /// Longitude rounded to 6 decimals, in micro-degrees.
    pub lon_e6: i64,
}

/// Unique node identity within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub core: NodeCore,
    /// Index of the originating row within the day.
    pub pair_index: usize,
    pub side: Side,
}

impl NodeId {
    /// Builds a node id from its parts.
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        lat: f64,
        lon: f64,
        pair_index: usize,
        side: Side,
    ) -> Self {
        Self {
            core: NodeCore {
                timestamp,
                lat_e6: micro_degrees(lat),
                lon_e6: micro_degrees(lon),
            },
            pair_index,
            side,
        }
    }
}

impl fmt::Display for NodeId {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}{}",
            self.core.timestamp.to_rfc3339(),
            self.core.lat_e6 as f64 / 1e6,
            self.core.lon_e6 as f64 / 1e6,
            self.pair_index,
            self.side.tag()
        )
    }
}

/// One detection, as a graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub locality: Option<String>,
    /// Speed recorded by the reader, when available (km/h).
    pub speed: Option<f64>,
}

/// Cannot-link edge between the two detections of a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub origin: NodeId,
    pub destination: NodeId,
    /// Observed distance (km).
    pub distance_km: Option<f64>,
    /// Observed elapsed time (s).
    pub elapsed_s: Option<f64>,
    /// Observed speed (km/h).
    pub speed_kmh: Option<f64>,
}

impl Edge {
    /// Returns both endpoint ids.
    #[must_use]
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.origin, self.destination)
    }

    /// Observed speed, derived from distance and elapsed time when the row
    /// carried no precomputed value.
    #[must_use]
    pub fn observed_speed_kmh(&self) -> Option<f64> {
        self.speed_kmh
            .or_else(|| implied_speed_kmh(self.distance_km?, self.elapsed_s?))
    }
}

/// Nodes and edges for one day.
///
/// Nodes are sorted by timestamp; ties keep row order.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<NodeId, usize>,
}

impl Graph {
    /// Builds a graph from nodes and edges, sorting nodes chronologically.
    #[must_use]
    pub fn from_parts(mut nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        nodes.sort_by_key(|node| node.timestamp);
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id, i))
            .collect();
        Self {
            nodes,
            edges,
            index,
        }
    }

    /// Nodes in chronological order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in row order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns true if the graph has no nodes or no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.edges.is_empty()
    }

    /// Position of a node in [`Graph::nodes`].
    #[must_use]
    pub fn position(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.position(id).map(|i| &self.nodes[i])
    }

    /// Maps every edge endpoint to the opposite endpoint.
    #[must_use]
    pub fn partner_map(&self) -> HashMap<NodeId, NodeId> {
        let mut partners = HashMap::with_capacity(self.edges.len() * 2);
        for edge in &self.edges {
            partners.insert(edge.origin, edge.destination);
            partners.insert(edge.destination, edge.origin);
        }
        partners
    }

    /// Distance covered by one pair: the precomputed value when present,
    /// otherwise the great-circle distance between its endpoints.
    #[must_use]
    pub fn pair_distance_km(&self, edge: &Edge) -> Option<f64> {
        if let Some(km) = edge.distance_km.filter(|km| km.is_finite()) {
            return Some(km);
        }
        let a = self.node(&edge.origin)?;
        let b = self.node(&edge.destination)?;
        Some(haversine_km(a.latitude, a.longitude, b.latitude, b.longitude))
    }

    /// Smallest pair distance over all edges, or 0 when none is known.
    #[must_use]
    pub fn min_pair_distance_km(&self) -> f64 {
        self.edges
            .iter()
            .filter_map(|edge| self.pair_distance_km(edge))
            .reduce(f64::min)
            .unwrap_or(0.0)
    }
}

/// Converts one day of detection-pair rows into a [`Graph`].
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    offset: FixedOffset,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }
}

impl GraphBuilder {
    /// Creates a builder reading naive timestamps as UTC.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder reading naive timestamps in `offset`.
    #[must_use]
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Builds nodes and edges for one day.
    ///
    /// Rows with an unparseable timestamp or a missing coordinate on either
    /// side contribute nothing.
    ///
    /// # Errors
    /// Returns [`Error::EmptyInput`] if `rows` is empty.
    pub fn build(&self, rows: &[DetectionPairRow]) -> Result<Graph> {
        if rows.is_empty() {
            return Err(Error::EmptyInput("no detection pairs for the day"));
        }

        let mut nodes = Vec::with_capacity(rows.len() * 2);
        let mut edges = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            let Some((origin, destination)) = self.node_pair(row, index) else {
                debug!("skipping pair {index}: unparseable timestamp or coordinates");
                continue;
            };
            edges.push(Edge {
                origin: origin.id,
                destination: destination.id,
                distance_km: row.distance_km,
                elapsed_s: row.elapsed_s,
                speed_kmh: row.speed_kmh,
            });
            nodes.push(origin);
            nodes.push(destination);
        }

        Ok(Graph::from_parts(nodes, edges))
    }

    fn node_pair(&self, row: &DetectionPairRow, index: usize) -> Option<(Node, Node)> {
        Some((
            self.node(row, index, Side::A)?,
            self.node(row, index, Side::B)?,
        ))
    }

    fn node(&self, row: &DetectionPairRow, index: usize, side: Side) -> Option<Node> {
        let endpoint = row.endpoint(side);
        let timestamp = parse_timestamp(endpoint.time, self.offset)?;
        let (latitude, longitude) = endpoint.coordinates()?;
        Some(Node {
            id: NodeId::new(timestamp, latitude, longitude, index, side),
            timestamp,
            latitude,
            longitude,
            street: endpoint.street.map(str::to_string),
            neighborhood: endpoint.neighborhood.map(str::to_string),
            locality: endpoint.locality.map(str::to_string),
            speed: endpoint.speed,
        })
    }
}
