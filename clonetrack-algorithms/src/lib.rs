//! clonetrack-algorithms: Separation of cloned-plate detections.
//!
//! This crate decides, for each day, whether suspicious detection pairs
//! belong to one vehicle or two, and splits them into tracks:
//! - **Detection** - suspicious consecutive pairs from raw detections
//! - **Greedy** - chronological assignment under a maximum-speed limit
//! - **Spatial** - 2-means on coordinates with local-search repair
//! - **Chain** - exact handling of two pairs sharing a detection
//! - **Validator** - feasibility gates and method selection
//! - **Tracks** - per-vehicle, chronologically ordered track tables
//! - **Pipeline** - per-day grouping, in parallel across days
//!
#![warn(missing_docs)]

mod chain;
mod detection;
mod greedy;
pub mod kmeans;
mod pipeline;
mod spatial;
mod tracks;
mod validator;

pub use chain::TwoPairsChainHandler;
pub use detection::{detect_pairs, CleanDetection, DetectionPreprocessor, PairDetector};
pub use greedy::{GreedyTemporalClustering, INFEASIBLE_PENALTY};
pub use pipeline::{build_daily_tracks, ClusteringPipeline, DayKey, DayTracks};
pub use spatial::{RepairStats, SpatialKMeansClustering};
pub use tracks::{extract_direction, TrackGenerator, TrackRow, VehicleTracks, UNKNOWN_DIRECTION};
pub use validator::{select_assignment, ClusteringValidator, DayAssessment, Rejection};

// Re-export core types used in the public API
pub use clonetrack_core::{Assignment, ClusteringConfig, Detection, Label, Method};
