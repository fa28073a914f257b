//! Suspicious-pair detection over one plate's raw detections.
//!
//! Detections are cleaned (timestamps parsed, text trimmed, repeated
//! time/position readings dropped), ordered by time, and every consecutive
//! pair whose implied speed is above the limit becomes a
//! [`DetectionPairRow`] ready for the per-day pipeline.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use clonetrack_core::geo::{haversine_km, implied_speed_kmh};
use clonetrack_core::time::parse_timestamp;
use clonetrack_core::{ClusteringConfig, Detection, DetectionPairRow, Error, Result};
use log::{debug, info};
use rayon::prelude::*;

/// A detection after preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanDetection {
    /// Parsed detection time.
    pub timestamp: DateTime<Utc>,
    /// Latitude, if it parsed.
    pub latitude: Option<f64>,
    /// Longitude, if it parsed.
    pub longitude: Option<f64>,
    /// Street, trimmed and non-empty.
    pub street: Option<String>,
    /// Neighborhood, trimmed and non-empty.
    pub neighborhood: Option<String>,
    /// Locality, trimmed and non-empty.
    pub locality: Option<String>,
    /// Speed measured by the reader (km/h).
    pub speed: Option<f64>,
    /// Reader code, trimmed and non-empty.
    pub equipment_code: Option<String>,
}

impl CleanDetection {
    /// Site label `"<locality> (<code>)"`, used as the pair's street text.
    ///
    /// Falls back to `"(<code>)"` without a locality and to the bare locality
    /// without a code.
    #[must_use]
    pub fn site_label(&self) -> Option<String> {
        match (self.locality.as_deref(), self.equipment_code.as_deref()) {
            (Some(locality), Some(code)) => Some(format!("{locality} ({code})")),
            (None, Some(code)) => Some(format!("({code})")),
            (Some(locality), None) => Some(locality.to_string()),
            (None, None) => None,
        }
    }

    fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }

    fn dedup_key(&self) -> (DateTime<Utc>, Option<u64>, Option<u64>) {
        (
            self.timestamp,
            self.latitude.map(f64::to_bits),
            self.longitude.map(f64::to_bits),
        )
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Cleans raw detections before pair detection.
#[derive(Debug, Clone)]
pub struct DetectionPreprocessor {
    offset: FixedOffset,
}

impl DetectionPreprocessor {
    /// Creates a preprocessor reading naive timestamps in `offset`.
    #[must_use]
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Parses, trims, orders and deduplicates detections.
    ///
    /// Rows whose timestamp does not parse are dropped. Among rows with the
    /// same time and exact coordinates only the first is kept. The result is
    /// in chronological order, ties keeping input order.
    ///
    /// # Errors
    /// Returns [`Error::EmptyInput`] when `detections` is empty.
    pub fn prepare(&self, detections: &[Detection]) -> Result<Vec<CleanDetection>> {
        if detections.is_empty() {
            return Err(Error::EmptyInput("no detections"));
        }

        let mut cleaned: Vec<CleanDetection> = detections
            .iter()
            .filter_map(|det| {
                let timestamp = parse_timestamp(&det.time, self.offset)?;
                Some(CleanDetection {
                    timestamp,
                    latitude: det.latitude,
                    longitude: det.longitude,
                    street: trimmed(det.street.as_deref()),
                    neighborhood: trimmed(det.neighborhood.as_deref()),
                    locality: trimmed(det.locality.as_deref()),
                    speed: det.speed,
                    equipment_code: trimmed(det.equipment_code.as_deref()),
                })
            })
            .collect();
        let unparsed = detections.len() - cleaned.len();

        cleaned.sort_by_key(|det| det.timestamp);
        let mut seen = HashSet::with_capacity(cleaned.len());
        cleaned.retain(|det| seen.insert(det.dedup_key()));

        debug!(
            "preprocessed {} detections: {} unparsed timestamps, {} kept",
            detections.len(),
            unparsed,
            cleaned.len()
        );
        Ok(cleaned)
    }
}

/// Finds consecutive detections too far apart for one vehicle.
#[derive(Debug, Clone)]
pub struct PairDetector {
    speed_limit_kmh: f64,
    offset: FixedOffset,
}

impl PairDetector {
    /// Creates a detector flagging pairs faster than `speed_limit_kmh`.
    ///
    /// Pair timestamps are written in `offset`.
    #[must_use]
    pub fn new(speed_limit_kmh: f64, offset: FixedOffset) -> Self {
        Self {
            speed_limit_kmh,
            offset,
        }
    }

    /// Creates a detector using the configured maximum speed and offset.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &ClusteringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.max_speed_kmh, config.offset()?))
    }

    /// Returns the speed limit.
    #[must_use]
    pub fn speed_limit_kmh(&self) -> f64 {
        self.speed_limit_kmh
    }

    /// Scans chronologically ordered detections and returns every
    /// consecutive pair whose implied speed is strictly above the limit.
    ///
    /// Pairs with non-positive elapsed time or missing coordinates are
    /// skipped. Output keeps the scan order.
    #[must_use]
    pub fn find_suspicious_pairs(&self, detections: &[CleanDetection]) -> Vec<DetectionPairRow> {
        let pairs: Vec<DetectionPairRow> = detections
            .par_windows(2)
            .filter_map(|window| self.analyze(&window[0], &window[1]))
            .collect();
        debug!(
            "{} suspicious pairs among {} consecutive detections",
            pairs.len(),
            detections.len().saturating_sub(1)
        );
        pairs
    }

    #[allow(clippy::cast_precision_loss)]
    fn analyze(&self, a: &CleanDetection, b: &CleanDetection) -> Option<DetectionPairRow> {
        let (lat1, lon1) = a.coordinates()?;
        let (lat2, lon2) = b.coordinates()?;
        let elapsed_s = (b.timestamp - a.timestamp).num_milliseconds() as f64 / 1000.0;
        if elapsed_s <= 0.0 {
            return None;
        }

        let distance_km = haversine_km(lat1, lon1, lat2, lon2);
        let speed_kmh = implied_speed_kmh(distance_km, elapsed_s)?;
        if speed_kmh <= self.speed_limit_kmh {
            return None;
        }

        Some(DetectionPairRow {
            origin_time: self.format_time(a.timestamp),
            destination_time: self.format_time(b.timestamp),
            origin_lat: Some(lat1),
            origin_lon: Some(lon1),
            destination_lat: Some(lat2),
            destination_lon: Some(lon2),
            distance_km: Some(distance_km),
            elapsed_s: Some(elapsed_s),
            speed_kmh: Some(speed_kmh),
            origin_street: a.site_label().or_else(|| a.street.clone()),
            destination_street: b.site_label().or_else(|| b.street.clone()),
            origin_neighborhood: a.neighborhood.clone(),
            destination_neighborhood: b.neighborhood.clone(),
            origin_locality: a.locality.clone(),
            destination_locality: b.locality.clone(),
            origin_speed: a.speed,
            destination_speed: b.speed,
        })
    }

    fn format_time(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.offset)
            .to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }
}

/// Preprocesses one plate's detections and returns its suspicious pairs.
///
/// # Errors
/// Returns an error if the configuration is invalid or `detections` is
/// empty.
pub fn detect_pairs(
    detections: &[Detection],
    config: &ClusteringConfig,
) -> Result<Vec<DetectionPairRow>> {
    let detector = PairDetector::from_config(config)?;
    let cleaned = DetectionPreprocessor::new(config.offset()?).prepare(detections)?;
    let pairs = detector.find_suspicious_pairs(&cleaned);
    info!(
        "found {} suspicious pairs in {} detections (limit {} km/h)",
        pairs.len(),
        cleaned.len(),
        detector.speed_limit_kmh()
    );
    Ok(pairs)
}
