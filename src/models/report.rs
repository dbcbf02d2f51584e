use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VitalMetric;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

/// Short-horizon view of one metric over the lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrendReport {
    pub current_value: f64,
    pub mean: f64,
    pub std: f64,
    pub trend_direction: TrendDirection,
    pub volatility: f64,   // std / mean, 0 when mean is 0
    pub forecast_next: f64,
}

/// Distribution of one metric over an explicit window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricHistoryReport {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub percentile_25: f64,
    pub percentile_75: f64,
    pub trend_strength: f64, // Pearson r in [-1, 1]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStatus {
    Analyzed,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentTrends {
    pub status: TrendStatus,
    pub trends: BTreeMap<VitalMetric, MetricTrendReport>,
}

impl RecentTrends {
    pub fn insufficient_data() -> Self {
        Self {
            status: TrendStatus::InsufficientData,
            trends: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub metrics: BTreeMap<VitalMetric, MetricHistoryReport>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Readings in the window, whether or not they carried a requested metric.
    pub data_points: usize,
}
