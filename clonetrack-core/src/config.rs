//! Clustering configuration.

use crate::{Error, Result};
use chrono::FixedOffset;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum plausible travel speed for a single vehicle (km/h).
pub const DEFAULT_MAX_SPEED_KMH: f64 = 110.0;

/// Pairs closer than this (km) cannot be told apart with confidence.
///
/// Calibration parameter, tuned empirically.
pub const MIN_PAIR_DISTANCE_KM: f64 = 2.0;

/// Smallest pair count handed to the greedy/spatial algorithms.
///
/// Days with at least three pairs but fewer than this are never clustered.
/// Calibration parameter, tuned empirically. It is also the lowest value
/// [`ClusteringConfig::validate`] accepts, so a three-pair day stays
/// unclusterable whatever the configuration.
pub const MIN_ALGORITHMIC_PAIRS: usize = 4;

/// Seed for the spatial 2-means initialisation.
pub const DEFAULT_KMEANS_SEED: u64 = 123;

/// Configuration for the per-day clustering pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClusteringConfig {
    /// Maximum speed (km/h) a single vehicle may travel between detections.
    pub max_speed_kmh: f64,
    /// Minimum inter-pair distance (km); days at or below it are rejected.
    pub min_pair_distance_km: f64,
    /// Smallest pair count resolved by the greedy/spatial algorithms.
    pub min_algorithmic_pairs: usize,
    /// Seed for spatial 2-means.
    pub kmeans_seed: u64,
    /// Offset of local time from UTC, in minutes.
    ///
    /// Used to interpret naive timestamps, to group rows by calendar day,
    /// and to format track times.
    pub utc_offset_minutes: i32,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_speed_kmh: DEFAULT_MAX_SPEED_KMH,
            min_pair_distance_km: MIN_PAIR_DISTANCE_KM,
            min_algorithmic_pairs: MIN_ALGORITHMIC_PAIRS,
            kmeans_seed: DEFAULT_KMEANS_SEED,
            utc_offset_minutes: 0,
        }
    }
}

impl ClusteringConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum feasible speed.
    #[must_use]
    pub fn with_max_speed_kmh(mut self, speed: f64) -> Self {
        self.max_speed_kmh = speed;
        self
    }

    /// Sets the minimum inter-pair distance.
    #[must_use]
    pub fn with_min_pair_distance_km(mut self, distance: f64) -> Self {
        self.min_pair_distance_km = distance;
        self
    }

    /// Sets the smallest pair count resolved algorithmically.
    #[must_use]
    pub fn with_min_algorithmic_pairs(mut self, pairs: usize) -> Self {
        self.min_algorithmic_pairs = pairs;
        self
    }

    /// Sets the 2-means seed.
    #[must_use]
    pub fn with_kmeans_seed(mut self, seed: u64) -> Self {
        self.kmeans_seed = seed;
        self
    }

    /// Sets the local UTC offset in minutes.
    #[must_use]
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Returns the configured local offset.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the offset is outside ±24h.
    pub fn offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "utc offset out of range: {} minutes",
                    self.utc_offset_minutes
                ))
            })
    }

    /// Checks that every parameter is usable.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] describing the first bad parameter.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_speed_kmh.is_finite() && self.max_speed_kmh > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "max speed must be positive, got {}",
                self.max_speed_kmh
            )));
        }
        if !(self.min_pair_distance_km.is_finite() && self.min_pair_distance_km >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "minimum pair distance must be non-negative, got {}",
                self.min_pair_distance_km
            )));
        }
        if self.min_algorithmic_pairs < MIN_ALGORITHMIC_PAIRS {
            return Err(Error::InvalidConfig(format!(
                "algorithmic separation needs at least {} pairs, got {}",
                MIN_ALGORITHMIC_PAIRS, self.min_algorithmic_pairs
            )));
        }
        self.offset().map(|_| ())
    }
}
