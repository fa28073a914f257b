//! Per-day pipeline: group rows by day, assess each day, build tracks.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{FixedOffset, NaiveDate};
use clonetrack_core::time::{local_day, parse_timestamp, DAY_FORMAT};
use clonetrack_core::{ClusteringConfig, DetectionPairRow, Method, Result};
use log::{debug, info, warn};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::tracks::{TrackGenerator, VehicleTracks};
use crate::validator::{ClusteringValidator, DayAssessment};

/// Calendar day in the configured local offset.
///
/// Orders chronologically and displays as `DD/MM/YYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayKey(pub NaiveDate);

impl DayKey {
    /// The underlying date.
    #[must_use]
    pub fn date(self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

#[cfg(feature = "serde")]
impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Output for one clusterable day.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DayTracks {
    /// Method that produced the labels.
    pub method: Method,
    /// Both vehicles' tracks.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub tracks: VehicleTracks,
}

/// Groups detection pairs by day and separates each day's vehicles.
#[derive(Debug, Clone)]
pub struct ClusteringPipeline {
    validator: ClusteringValidator,
    generator: TrackGenerator,
    offset: FixedOffset,
}

impl ClusteringPipeline {
    /// Creates a pipeline.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ClusteringConfig) -> Result<Self> {
        let offset = config.offset()?;
        let validator = ClusteringValidator::new(config)?;
        Ok(Self {
            validator,
            generator: TrackGenerator::new(offset),
            offset,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ClusteringConfig {
        self.validator.config()
    }

    /// Splits rows by the local day of their origin timestamp.
    ///
    /// Rows whose origin timestamp cannot be parsed belong to no day.
    #[must_use]
    pub fn group_by_day(
        &self,
        rows: &[DetectionPairRow],
    ) -> BTreeMap<DayKey, Vec<DetectionPairRow>> {
        let mut days: BTreeMap<DayKey, Vec<DetectionPairRow>> = BTreeMap::new();
        let mut dropped = 0usize;
        for row in rows {
            match parse_timestamp(&row.origin_time, self.offset) {
                Some(ts) => days
                    .entry(DayKey(local_day(ts, self.offset)))
                    .or_default()
                    .push(row.clone()),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!("{dropped} rows without a parseable origin timestamp");
        }
        days
    }

    /// Assesses every day, clusterable or not.
    #[must_use]
    pub fn assess_days(&self, rows: &[DetectionPairRow]) -> BTreeMap<DayKey, DayAssessment> {
        self.group_by_day(rows)
            .into_par_iter()
            .map(|(day, day_rows)| {
                let assessment = self.validator.is_clusterable(&day_rows);
                match (assessment.method, assessment.rejection) {
                    (Some(method), _) => debug!(
                        "{day}: {} pairs, min {:.2} km, {method} ({} violations)",
                        assessment.n_pairs, assessment.min_pair_km, assessment.violations
                    ),
                    (None, Some(reason)) => {
                        debug!("{day}: {} pairs, rejected: {reason}", assessment.n_pairs);
                    }
                    (None, None) => {}
                }
                (day, assessment)
            })
            .collect()
    }

    /// Builds tracks for every clusterable day.
    ///
    /// Days that are rejected or yield no labels are left out.
    #[must_use]
    pub fn build_daily_tracks(&self, rows: &[DetectionPairRow]) -> BTreeMap<DayKey, DayTracks> {
        let assessed = self.assess_days(rows);
        let total = assessed.len();

        let result: BTreeMap<DayKey, DayTracks> = assessed
            .into_par_iter()
            .filter_map(|(day, assessment)| self.day_tracks(&assessment).map(|t| (day, t)))
            .collect();

        info!("{} of {total} days separated into two vehicles", result.len());
        result
    }

    /// Tracks for an assessed day, or `None` if it was not clusterable.
    #[must_use]
    pub fn day_tracks(&self, assessment: &DayAssessment) -> Option<DayTracks> {
        let method = assessment.method?;
        if assessment.assignment.is_empty() {
            return None;
        }
        Some(DayTracks {
            method,
            tracks: self
                .generator
                .generate(&assessment.graph, &assessment.assignment),
        })
    }
}

/// Builds per-day vehicle tracks for all rows.
///
/// # Errors
/// Returns an error if `config` is invalid.
pub fn build_daily_tracks(
    rows: &[DetectionPairRow],
    config: &ClusteringConfig,
) -> Result<BTreeMap<DayKey, DayTracks>> {
    Ok(ClusteringPipeline::new(config.clone())?.build_daily_tracks(rows))
}
