//! Reading storage.
//!
//! The engine only sees the [`ReadingStore`] trait; [`SqliteReadingStore`] is
//! the bundled implementation backed by a single SQLite table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::Reading;

pub mod migrations;
pub mod queries;
pub mod sqlite;

pub use sqlite::SqliteReadingStore;

/// Source of vital-sign readings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Readings for `patient_id` with `start <= timestamp <= end`.
    ///
    /// Implementations document the order they return rows in; callers must
    /// not rely on it.
    async fn fetch_readings(
        &self,
        patient_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, StoreError>;
}
