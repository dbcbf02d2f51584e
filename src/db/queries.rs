pub const INSERT_READING: &str = "INSERT INTO vital_readings (
        event_id, patient_id, timestamp, heart_rate,
        blood_pressure_systolic, blood_pressure_diastolic,
        temperature, oxygen_saturation, respiratory_rate
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Newest first, matching how the monitoring feed reads the table.
pub const SELECT_READINGS_IN_WINDOW: &str = "SELECT patient_id, timestamp, heart_rate,
        blood_pressure_systolic, blood_pressure_diastolic,
        temperature, oxygen_saturation, respiratory_rate
    FROM vital_readings
    WHERE patient_id = ? AND timestamp >= ? AND timestamp <= ?
    ORDER BY timestamp DESC";
