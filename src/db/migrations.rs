use sqlx::SqlitePool;

/// Creates the readings table and its lookup index if they don't exist.
pub async fn initialize_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS vital_readings (
            event_id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            heart_rate REAL,
            blood_pressure_systolic REAL,
            blood_pressure_diastolic REAL,
            temperature REAL,
            oxygen_saturation REAL,
            respiratory_rate REAL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_vital_readings_patient_time
         ON vital_readings (patient_id, timestamp)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
