use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::UnknownMetric;

/// One timestamped set of vital signs for one patient.
///
/// Each field is independently nullable since a monitor may omit any of them.
/// Ranges are sanity bounds for sensor artifacts, not clinical limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Reading {
    #[validate(length(min = 1))]
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    #[validate(range(min = 0.0, max = 350.0))]
    pub heart_rate: Option<f64>,
    #[validate(range(min = 0.0, max = 350.0))]
    pub blood_pressure_systolic: Option<f64>,
    #[validate(range(min = 0.0, max = 250.0))]
    pub blood_pressure_diastolic: Option<f64>,
    #[validate(range(min = 20.0, max = 46.0))]
    pub temperature: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub oxygen_saturation: Option<f64>,
    #[validate(range(min = 0.0, max = 120.0))]
    pub respiratory_rate: Option<f64>,
}

impl Reading {
    /// An empty reading; vitals are filled in with struct update syntax.
    pub fn new(patient_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            patient_id: patient_id.into(),
            timestamp,
            heart_rate: None,
            blood_pressure_systolic: None,
            blood_pressure_diastolic: None,
            temperature: None,
            oxygen_saturation: None,
            respiratory_rate: None,
        }
    }
}

/// The vital fields a [`Reading`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalMetric {
    HeartRate,
    BloodPressureSystolic,
    BloodPressureDiastolic,
    Temperature,
    OxygenSaturation,
    RespiratoryRate,
}

impl VitalMetric {
    pub const ALL: [VitalMetric; 6] = [
        VitalMetric::HeartRate,
        VitalMetric::BloodPressureSystolic,
        VitalMetric::BloodPressureDiastolic,
        VitalMetric::Temperature,
        VitalMetric::OxygenSaturation,
        VitalMetric::RespiratoryRate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VitalMetric::HeartRate => "heart_rate",
            VitalMetric::BloodPressureSystolic => "blood_pressure_systolic",
            VitalMetric::BloodPressureDiastolic => "blood_pressure_diastolic",
            VitalMetric::Temperature => "temperature",
            VitalMetric::OxygenSaturation => "oxygen_saturation",
            VitalMetric::RespiratoryRate => "respiratory_rate",
        }
    }

    /// Reads this metric off a reading.
    pub fn value(self, reading: &Reading) -> Option<f64> {
        match self {
            VitalMetric::HeartRate => reading.heart_rate,
            VitalMetric::BloodPressureSystolic => reading.blood_pressure_systolic,
            VitalMetric::BloodPressureDiastolic => reading.blood_pressure_diastolic,
            VitalMetric::Temperature => reading.temperature,
            VitalMetric::OxygenSaturation => reading.oxygen_saturation,
            VitalMetric::RespiratoryRate => reading.respiratory_rate,
        }
    }
}

impl fmt::Display for VitalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VitalMetric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VitalMetric::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

/// Non-null values of one metric, oldest first.
///
/// Construction fails on empty input, so every statistic computed from a
/// series has at least one point to work with.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    values: Vec<f64>,
}

#[allow(clippy::len_without_is_empty)]
impl MetricSeries {
    /// `None` when `values` is empty or holds a NaN or infinity.
    pub fn new(values: Vec<f64>) -> Option<Self> {
        if values.is_empty() || values.iter().any(|value| !value.is_finite()) {
            None
        } else {
            Some(Self { values })
        }
    }

    /// Collects `metric` from readings that are already sorted oldest first.
    /// Missing and non-finite values are skipped.
    pub fn extract(readings: &[Reading], metric: VitalMetric) -> Option<Self> {
        let values = readings
            .iter()
            .filter_map(|reading| metric.value(reading))
            .filter(|value| value.is_finite())
            .collect();
        Self::new(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// The most recent observation.
    pub fn latest(&self) -> f64 {
        // non-empty by construction
        self.values[self.values.len() - 1]
    }
}
