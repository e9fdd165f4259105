//! Error types for the fill-detection pipeline

use crate::chart::{Difficulty, Instrument};
use std::fmt;

/// Custom error type for fill detection
#[derive(Debug, Clone, PartialEq)]
pub enum FillError {
    /// Chart shape is invalid (bad resolution, missing data)
    InvalidChart(String),
    /// Tempo list failed validation (unsorted, empty, non-positive BPM)
    InvalidTempo(String),
    /// Configuration validation failed
    InvalidConfig(String),
    /// The requested instrument/difficulty track is not present in the chart
    TrackNotFound {
        instrument: Instrument,
        difficulty: Difficulty,
    },
}

impl fmt::Display for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillError::InvalidChart(msg) => write!(f, "Invalid chart - {}", msg),
            FillError::InvalidTempo(msg) => write!(f, "Invalid tempo map - {}", msg),
            FillError::InvalidConfig(msg) => write!(f, "Invalid configuration - {}", msg),
            FillError::TrackNotFound {
                instrument,
                difficulty,
            } => write!(
                f,
                "Track not found for {} ({})",
                instrument.name(),
                difficulty.name()
            ),
        }
    }
}

impl std::error::Error for FillError {}

/// Result type alias for fill-detection operations
pub type Result<T> = std::result::Result<T, FillError>;
