use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::{migrations, queries, ReadingStore};
use crate::error::StoreError;
use crate::models::Reading;

/// SQLite-backed reading store.
///
/// Timestamps are stored as Unix seconds. [`ReadingStore::fetch_readings`]
/// returns rows newest first.
#[derive(Clone)]
pub struct SqliteReadingStore {
    pool: SqlitePool,
}

impl SqliteReadingStore {
    /// Opens (creating if missing) the database at `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        migrations::initialize_schema(&self.pool).await?;
        Ok(())
    }

    /// Validates and stores a reading, returning its event id.
    #[instrument(skip(self, reading), fields(patient_id = %reading.patient_id))]
    pub async fn record_reading(&self, reading: &Reading) -> Result<Uuid, StoreError> {
        reading.validate()?;

        let event_id = Uuid::new_v4();

        sqlx::query(queries::INSERT_READING)
            .bind(event_id.to_string())
            .bind(&reading.patient_id)
            .bind(reading.timestamp.timestamp())
            .bind(reading.heart_rate)
            .bind(reading.blood_pressure_systolic)
            .bind(reading.blood_pressure_diastolic)
            .bind(reading.temperature)
            .bind(reading.oxygen_saturation)
            .bind(reading.respiratory_rate)
            .execute(&self.pool)
            .await?;

        debug!(%event_id, "recorded reading");
        Ok(event_id)
    }
}

#[async_trait]
impl ReadingStore for SqliteReadingStore {
    #[instrument(skip(self), fields(patient_id = %patient_id))]
    async fn fetch_readings(
        &self,
        patient_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, StoreError> {
        let rows = sqlx::query(queries::SELECT_READINGS_IN_WINDOW)
            .bind(patient_id)
            .bind(start.timestamp())
            .bind(end.timestamp())
            .fetch_all(&self.pool)
            .await?;

        let mut readings = Vec::with_capacity(rows.len());

        for row in rows {
            let reading = reading_from_row(&row)?;

            // sensor artifacts written by other producers are dropped here
            if let Err(errors) = reading.validate() {
                warn!(timestamp = %reading.timestamp, %errors, "skipping invalid reading");
                continue;
            }

            readings.push(reading);
        }

        Ok(readings)
    }
}

fn reading_from_row(row: &SqliteRow) -> Result<Reading, StoreError> {
    Ok(Reading {
        patient_id: row.try_get("patient_id")?,
        timestamp: timestamp_from_secs(row.try_get("timestamp")?)?,
        heart_rate: row.try_get("heart_rate")?,
        blood_pressure_systolic: row.try_get("blood_pressure_systolic")?,
        blood_pressure_diastolic: row.try_get("blood_pressure_diastolic")?,
        temperature: row.try_get("temperature")?,
        oxygen_saturation: row.try_get("oxygen_saturation")?,
        respiratory_rate: row.try_get("respiratory_rate")?,
    })
}

fn timestamp_from_secs(seconds: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| StoreError::Corrupt(format!("invalid timestamp {}", seconds)))
}
