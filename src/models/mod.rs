//! Readings in, reports out.

pub mod reading;
pub mod report;

pub use reading::{MetricSeries, Reading, VitalMetric};
pub use report::{
    HistorySummary, MetricHistoryReport, MetricTrendReport, RecentTrends, TrendDirection,
    TrendStatus,
};
