//! Error taxonomy for the trend engine and its storage collaborator.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::VitalMetric;

/// Failures surfaced by [`crate::engine::TrendEngine`] operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The requested window ends before it starts, or its start lies before
    /// the earliest representable instant (reported as `DateTime::MIN_UTC`).
    /// Rejected before any fetch.
    #[error("invalid time window: {start} to {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The reading store failed. The adapter's error is carried unchanged.
    #[error("reading store unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),
}

/// Failures raised by a [`crate::db::ReadingStore`] implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("reading failed validation: {0}")]
    InvalidReading(#[from] validator::ValidationErrors),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Expected numeric edge cases. These never leave the engine: a metric below
/// its gate is omitted from the report and a degenerate smoothing fit falls
/// back to the identity forecast.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("{metric} has {points} points, {required} required")]
    MetricBelowThreshold {
        metric: VitalMetric,
        points: usize,
        required: usize,
    },

    #[error("smoothing fit degenerate: {0}")]
    NumericDegenerate(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown vital metric: {0}")]
pub struct UnknownMetric(pub String);

pub type Result<T> = std::result::Result<T, EngineError>;
