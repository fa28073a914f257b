//! Per-vehicle track tables.
//!
//! A track is the chronologically ordered list of one vehicle's detections on
//! one day, with display fields derived from the free-text location columns.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{FixedOffset, Offset, Utc};
use clonetrack_core::geo::{micro_degrees, round6};
use clonetrack_core::time::format_local;
use clonetrack_core::{Assignment, Graph, Label, Node};
use regex::Regex;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Direction reported when the street text carries none.
pub const UNKNOWN_DIRECTION: &str = "N/A";

static DASHED_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\s*([^\-]+?)\s*-").expect("valid direction pattern"));

static SENTIDO_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:SENTIDO|SENT\.?|SENT\s*:)\s*([A-ZÁÉÍÓÚÂÊÔÃÕÇ0-9/\s]+)")
        .expect("valid direction pattern")
});

/// One row of a track table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TrackRow {
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub time: String,
    /// Street, else locality, else neighborhood.
    pub location: String,
    /// Neighborhood, trimmed.
    pub neighborhood: Option<String>,
    /// Travel direction parsed from the street text.
    pub direction: String,
    /// Latitude rounded to 6 decimals.
    pub latitude: f64,
    /// Longitude rounded to 6 decimals.
    pub longitude: f64,
}

/// Both vehicles' tracks for one day.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct VehicleTracks {
    /// Rows labelled vehicle 0.
    pub vehicle0: Vec<TrackRow>,
    /// Rows labelled vehicle 1.
    pub vehicle1: Vec<TrackRow>,
}

impl VehicleTracks {
    /// Track of one vehicle.
    #[must_use]
    pub fn get(&self, label: Label) -> &[TrackRow] {
        match label {
            Label::Vehicle0 => &self.vehicle0,
            Label::Vehicle1 => &self.vehicle1,
        }
    }

    /// Returns true if neither vehicle has a row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vehicle0.is_empty() && self.vehicle1.is_empty()
    }
}

/// Turns labelled graph nodes into track tables.
#[derive(Debug, Clone)]
pub struct TrackGenerator {
    offset: FixedOffset,
}

impl Default for TrackGenerator {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl TrackGenerator {
    /// Creates a generator that formats times in `offset`.
    #[must_use]
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Builds both tracks. Unlabelled nodes appear in neither.
    #[must_use]
    pub fn generate(&self, graph: &Graph, assignment: &Assignment) -> VehicleTracks {
        VehicleTracks {
            vehicle0: self.track(graph, assignment, Label::Vehicle0),
            vehicle1: self.track(graph, assignment, Label::Vehicle1),
        }
    }

    fn track(&self, graph: &Graph, assignment: &Assignment, label: Label) -> Vec<TrackRow> {
        let mut rows: Vec<TrackRow> = graph
            .nodes()
            .iter()
            .filter(|node| assignment.get(&node.id) == Some(label))
            .filter(|node| node.latitude.is_finite() && node.longitude.is_finite())
            .map(|node| self.row(node))
            .collect();

        rows.sort_by(|a, b| a.time.cmp(&b.time));

        let mut seen = HashSet::with_capacity(rows.len());
        rows.retain(|row| {
            seen.insert((
                row.time.clone(),
                micro_degrees(row.latitude),
                micro_degrees(row.longitude),
            ))
        });
        rows
    }

    fn row(&self, node: &Node) -> TrackRow {
        let street = non_blank(node.street.as_deref());
        let location = street
            .or_else(|| non_blank(node.locality.as_deref()))
            .or_else(|| non_blank(node.neighborhood.as_deref()))
            .unwrap_or_default();

        TrackRow {
            time: format_local(node.timestamp, self.offset),
            location: location.to_string(),
            neighborhood: node.neighborhood.as_deref().map(|s| s.trim().to_string()),
            direction: street.map_or_else(|| UNKNOWN_DIRECTION.to_string(), extract_direction),
            latitude: round6(node.latitude),
            longitude: round6(node.longitude),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Extracts the travel direction from a street description.
///
/// A segment enclosed by hyphens wins (`"AV BRASIL - SENTIDO CENTRO - KM 10"`
/// gives `"CENTRO"`); otherwise the text after a `SENTIDO`/`SENT.`/`SENT:`
/// keyword is used. Returns [`UNKNOWN_DIRECTION`] when neither matches.
#[must_use]
pub fn extract_direction(street: &str) -> String {
    if let Some(segment) = DASHED_SEGMENT.captures(street).and_then(|c| c.get(1)) {
        return segment
            .as_str()
            .trim()
            .to_uppercase()
            .replace("SENTIDO ", "")
            .replace("SENT ", "");
    }
    if let Some(tail) = SENTIDO_KEYWORD.captures(street).and_then(|c| c.get(1)) {
        return tail.as_str().trim().to_uppercase();
    }
    UNKNOWN_DIRECTION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use clonetrack_core::{DetectionPairRow, GraphBuilder};

    const A: (f64, f64) = (-22.900_000_4, -43.20);
    const B: (f64, f64) = (-22.80, -43.60);
    const C: (f64, f64) = (-23.00, -43.30);

    fn chain_graph() -> Graph {
        GraphBuilder::new()
            .build(&[
                DetectionPairRow::new("2024-05-10 08:00:00", A, "2024-05-10 08:10:00", B)
                    .with_streets("AV BRASIL - SENTIDO CENTRO - KM 10", "RUA B SENTIDO ZONA SUL")
                    .with_neighborhoods("PENHA", " CENTRO "),
                DetectionPairRow::new("2024-05-10 08:10:00", B, "2024-05-10 08:20:00", C)
                    .with_streets("RUA B SENTIDO ZONA SUL", "RUA DAS FLORES"),
            ])
            .unwrap()
    }

    fn chain_labels(graph: &Graph) -> Assignment {
        crate::chain::TwoPairsChainHandler::handle(graph.edges()).unwrap()
    }

    #[test]
    fn test_empty_assignment_gives_empty_tracks() {
        let graph = chain_graph();
        let tracks = TrackGenerator::default().generate(&graph, &Assignment::new());
        assert!(tracks.vehicle0.is_empty());
        assert!(tracks.vehicle1.is_empty());
        assert!(tracks.is_empty());
    }

    #[test]
    fn test_chain_tracks() {
        let graph = chain_graph();
        let tracks = TrackGenerator::default().generate(&graph, &chain_labels(&graph));

        let v0 = tracks.get(Label::Vehicle0);
        assert_eq!(v0.len(), 2);
        assert_eq!(v0[0].time, "2024-05-10 08:00:00");
        assert_eq!(v0[0].location, "AV BRASIL - SENTIDO CENTRO - KM 10");
        assert_eq!(v0[0].direction, "CENTRO");
        assert_eq!(v0[0].neighborhood.as_deref(), Some("PENHA"));
        assert_relative_eq!(v0[0].latitude, -22.9);
        assert_eq!(v0[1].time, "2024-05-10 08:20:00");
        assert_eq!(v0[1].direction, "N/A");

        // B is reported twice, once per pair.
        let v1 = tracks.get(Label::Vehicle1);
        assert_eq!(v1.len(), 1);
        assert_eq!(v1[0].time, "2024-05-10 08:10:00");
        assert_eq!(v1[0].direction, "ZONA SUL");
        assert_eq!(v1[0].neighborhood.as_deref(), Some("CENTRO"));
    }

    #[test]
    fn test_tracks_sorted_and_unique() {
        let graph = chain_graph();
        let tracks = TrackGenerator::default().generate(&graph, &chain_labels(&graph));
        for label in Label::ALL {
            let rows = tracks.get(label);
            assert!(rows.windows(2).all(|w| w[0].time <= w[1].time));
            let keys: HashSet<_> = rows
                .iter()
                .map(|r| (r.time.clone(), micro_degrees(r.latitude), micro_degrees(r.longitude)))
                .collect();
            assert_eq!(keys.len(), rows.len());
        }
    }

    #[test]
    fn test_local_time_formatting() {
        let graph = chain_graph();
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let tracks = TrackGenerator::new(offset).generate(&graph, &chain_labels(&graph));
        assert_eq!(tracks.vehicle0[0].time, "2024-05-10 05:00:00");
    }

    #[test]
    fn test_location_fallbacks() {
        let mut row = DetectionPairRow::new(
            "2024-05-10 08:00:00",
            (-22.9, -43.2),
            "2024-05-10 08:30:00",
            (-23.2, -43.6),
        );
        row.origin_street = Some("   ".to_string());
        row.origin_locality = Some("Km 12 Linha Amarela".to_string());
        row.destination_neighborhood = Some("Barra".to_string());
        let graph = GraphBuilder::new().build(&[row]).unwrap();
        let labels: Assignment = graph
            .edges()
            .iter()
            .flat_map(|e| [(e.origin, Label::Vehicle0), (e.destination, Label::Vehicle1)])
            .collect();

        let tracks = TrackGenerator::default().generate(&graph, &labels);
        assert_eq!(tracks.vehicle0[0].location, "Km 12 Linha Amarela");
        assert_eq!(tracks.vehicle0[0].direction, "N/A");
        assert_eq!(tracks.vehicle1[0].location, "Barra");
        assert!(tracks.vehicle0[0].neighborhood.is_none());
    }

    #[test]
    fn test_extract_direction() {
        assert_eq!(extract_direction("AV BRASIL - SENTIDO CENTRO - KM 10"), "CENTRO");
        assert_eq!(extract_direction("Av. Brasil - sent Centro - km 10"), "CENTRO");
        assert_eq!(extract_direction("LINHA VERMELHA - BAIXADA - PISTA"), "BAIXADA");
        assert_eq!(extract_direction("RUA X SENTIDO ZONA SUL"), "ZONA SUL");
        assert_eq!(extract_direction("Estrada Y sent. barra"), "BARRA");
        assert_eq!(extract_direction("Estrada Y SENT: NITERÓI/RJ"), "NITERÓI/RJ");
        assert_eq!(extract_direction("RUA DAS FLORES"), "N/A");
        assert_eq!(extract_direction(""), "N/A");
    }
}
