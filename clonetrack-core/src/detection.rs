//! Raw plate detections and suspicious detection-pair rows.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One reader detection of a plate, as received.
///
/// The timestamp is kept as text until preprocessing; numeric fields that
/// failed to parse are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Detection {
    pub time: String,
    pub plate: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub locality: Option<String>,
    /// Speed measured by the reader (km/h).
    pub speed: Option<f64>,
    /// Code of the reader that produced the detection.
    pub equipment_code: Option<String>,
}

impl Detection {
    /// Creates a detection from its timestamp and position.
    pub fn new(time: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            time: time.into(),
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Self::default()
        }
    }

    /// Sets the locality and the reader code.
    #[must_use]
    pub fn with_site(mut self, locality: &str, equipment_code: &str) -> Self {
        self.locality = Some(locality.to_string());
        self.equipment_code = Some(equipment_code.to_string());
        self
    }

    /// Sets the neighborhood.
    #[must_use]
    pub fn with_neighborhood(mut self, neighborhood: &str) -> Self {
        self.neighborhood = Some(neighborhood.to_string());
        self
    }

    /// Sets the measured speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// Which end of a detection pair a node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    /// Origin detection.
    A,
    /// Destination detection.
    B,
}

impl Side {
    /// Lower-case tag used in textual node ids.
    #[must_use]
    pub fn tag(self) -> char {
        match self {
            Self::A => 'a',
            Self::B => 'b',
        }
    }
}

/// One suspicious pair: two detections of the same plate whose implied
/// travel is inconsistent with a single vehicle.
///
/// Timestamps are kept as received; they are parsed when the day's graph is
/// built. Numeric fields that failed to parse upstream are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectionPairRow {
    pub origin_time: String,
    pub destination_time: String,
    pub origin_lat: Option<f64>,
    pub origin_lon: Option<f64>,
    pub destination_lat: Option<f64>,
    pub destination_lon: Option<f64>,
    /// Precomputed distance between the two detections (km).
    pub distance_km: Option<f64>,
    /// Precomputed elapsed time between the two detections (s).
    pub elapsed_s: Option<f64>,
    /// Precomputed implied speed (km/h).
    pub speed_kmh: Option<f64>,
    pub origin_street: Option<String>,
    pub destination_street: Option<String>,
    pub origin_neighborhood: Option<String>,
    pub destination_neighborhood: Option<String>,
    pub origin_locality: Option<String>,
    pub destination_locality: Option<String>,
    /// Speed recorded by the reader at the origin (km/h).
    pub origin_speed: Option<f64>,
    /// Speed recorded by the reader at the destination (km/h).
    pub destination_speed: Option<f64>,
}

/// Borrowed view of one side of a [`DetectionPairRow`].
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub time: &'a str,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub street: Option<&'a str>,
    pub neighborhood: Option<&'a str>,
    pub locality: Option<&'a str>,
    pub speed: Option<f64>,
}

impl Endpoint<'_> {
    /// Returns the coordinates if both are present and finite.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

impl DetectionPairRow {
    /// Creates a row from the two timestamps and positions.
    pub fn new(
        origin_time: impl Into<String>,
        origin: (f64, f64),
        destination_time: impl Into<String>,
        destination: (f64, f64),
    ) -> Self {
        Self {
            origin_time: origin_time.into(),
            destination_time: destination_time.into(),
            origin_lat: Some(origin.0),
            origin_lon: Some(origin.1),
            destination_lat: Some(destination.0),
            destination_lon: Some(destination.1),
            ..Self::default()
        }
    }

    /// Sets the precomputed distance, elapsed time and speed.
    #[must_use]
    pub fn with_measurements(
        mut self,
        distance_km: Option<f64>,
        elapsed_s: Option<f64>,
        speed_kmh: Option<f64>,
    ) -> Self {
        self.distance_km = distance_km;
        self.elapsed_s = elapsed_s;
        self.speed_kmh = speed_kmh;
        self
    }

    /// Sets the street description of both detections.
    #[must_use]
    pub fn with_streets(mut self, origin: &str, destination: &str) -> Self {
        self.origin_street = Some(origin.to_string());
        self.destination_street = Some(destination.to_string());
        self
    }

    /// Sets the neighborhood of both detections.
    #[must_use]
    pub fn with_neighborhoods(mut self, origin: &str, destination: &str) -> Self {
        self.origin_neighborhood = Some(origin.to_string());
        self.destination_neighborhood = Some(destination.to_string());
        self
    }

    /// Returns one side of the pair.
    #[must_use]
    pub fn endpoint(&self, side: Side) -> Endpoint<'_> {
        match side {
            Side::A => Endpoint {
                time: &self.origin_time,
                lat: self.origin_lat,
                lon: self.origin_lon,
                street: self.origin_street.as_deref(),
                neighborhood: self.origin_neighborhood.as_deref(),
                locality: self.origin_locality.as_deref(),
                speed: self.origin_speed,
            },
            Side::B => Endpoint {
                time: &self.destination_time,
                lat: self.destination_lat,
                lon: self.destination_lon,
                street: self.destination_street.as_deref(),
                neighborhood: self.destination_neighborhood.as_deref(),
                locality: self.destination_locality.as_deref(),
                speed: self.destination_speed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_views() {
        let row = DetectionPairRow::new(
            "2024-05-10 08:00:00",
            (-22.9, -43.2),
            "2024-05-10 08:10:00",
            (-23.0, -43.5),
        )
        .with_streets("AV BRASIL - SENTIDO CENTRO -", "RUA A");

        let a = row.endpoint(Side::A);
        assert_eq!(a.time, "2024-05-10 08:00:00");
        assert_eq!(a.coordinates(), Some((-22.9, -43.2)));
        assert_eq!(a.street, Some("AV BRASIL - SENTIDO CENTRO -"));

        let b = row.endpoint(Side::B);
        assert_eq!(b.coordinates(), Some((-23.0, -43.5)));
        assert_eq!(b.street, Some("RUA A"));
        assert!(b.neighborhood.is_none());
    }

    #[test]
    fn test_missing_or_nan_coordinates() {
        let mut row = DetectionPairRow::new("t0", (0.0, 0.0), "t1", (1.0, 1.0));
        row.origin_lat = None;
        assert!(row.endpoint(Side::A).coordinates().is_none());

        row.destination_lon = Some(f64::NAN);
        assert!(row.endpoint(Side::B).coordinates().is_none());
    }

    #[test]
    fn test_detection_builder() {
        let det = Detection::new("2024-05-10 08:00:00", -22.9, -43.2)
            .with_site("AV BRASIL", "1042")
            .with_speed(63.0);
        assert_eq!(det.latitude, Some(-22.9));
        assert_eq!(det.locality.as_deref(), Some("AV BRASIL"));
        assert_eq!(det.equipment_code.as_deref(), Some("1042"));
        assert_eq!(det.speed, Some(63.0));
        assert!(det.neighborhood.is_none());
    }

    #[test]
    fn test_side_tags() {
        assert_eq!(Side::A.tag(), 'a');
        assert_eq!(Side::B.tag(), 'b');
        assert!(Side::A < Side::B);
    }
}
