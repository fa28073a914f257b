//! clonetrack-core: Core types for cloned-plate track separation.
//!
//! This crate provides the foundational abstractions shared by the
//! clustering algorithms: raw detections, detection-pair rows, the
//! cannot-link constraint graph, vehicle label assignments, geodesic helpers
//! and configuration.
//!

pub mod config;
pub mod detection;
pub mod error;
pub mod geo;
pub mod graph;
pub mod label;
pub mod time;

pub use config::ClusteringConfig;
pub use detection::{Detection, DetectionPairRow, Endpoint, Side};
pub use error::{Error, Result};
pub use graph::{Edge, Graph, GraphBuilder, Node, NodeCore, NodeId};
pub use label::{Assignment, Label, Method};
