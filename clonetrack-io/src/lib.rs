//! clonetrack-io: file I/O for clonetrack.
//!
//! Reads raw plate detections and detection-pair tables from CSV, writes
//! detected pairs back as CSV, and writes per-day results as JSON or as one
//! CSV track table per vehicle.
//!

mod config;
mod error;
mod reader;
mod writer;

pub use config::load_config;
pub use error::{Error, Result};
pub use reader::{DetectionReader, PairReader};
pub use writer::{PairWriter, ResultWriter, PAIR_HEADER, TRACK_HEADER};
