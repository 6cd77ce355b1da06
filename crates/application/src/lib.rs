//! Ferrous Tap Application Layer
pub mod ports;
pub mod stats;
pub mod use_cases;

pub use stats::{IngestStats, IngestStatsSnapshot};
