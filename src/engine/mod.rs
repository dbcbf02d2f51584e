//! Trend engine: fetches a patient's readings and turns them into per-metric
//! trend and history reports.
//!
//! All numeric work is synchronous. The only suspension point is the fetch,
//! which is bounded by the configured timeout and never retried here.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use crate::config::AnalysisConfig;
use crate::core::{forecast_next, Summary, TrendFit};
use crate::db::ReadingStore;
use crate::error::{AnalysisError, EngineError, Result, StoreError};
use crate::models::{
    HistorySummary, MetricHistoryReport, MetricSeries, MetricTrendReport, Reading, RecentTrends,
    TrendStatus, VitalMetric,
};

pub mod cache;

pub use cache::{HistoryCache, HistoryKey};

pub struct TrendEngine<S> {
    store: S,
    config: AnalysisConfig,
    cache: Option<HistoryCache>,
}

impl<S: ReadingStore> TrendEngine<S> {
    pub fn new(store: S, config: AnalysisConfig) -> Self {
        let cache = config.cache_ttl().map(HistoryCache::new);
        Self {
            store,
            config,
            cache,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Trend, volatility and forecast for each tracked metric over the
    /// trailing `lookback` (the configured default when `None`).
    ///
    /// Metrics with fewer than `min_trend_points` values are left out of the
    /// result. No readings at all yields [`TrendStatus::InsufficientData`].
    #[instrument(skip(self), fields(patient_id = %patient_id))]
    pub async fn analyze_recent_trends(
        &self,
        patient_id: &str,
        lookback: Option<Duration>,
    ) -> Result<RecentTrends> {
        let lookback = lookback.unwrap_or_else(|| self.config.lookback());
        let end = Utc::now();
        let start = end
            .checked_sub_signed(lookback)
            .ok_or(EngineError::InvalidWindow {
                start: DateTime::<Utc>::MIN_UTC,
                end,
            })?;
        validate_window(start, end)?;

        let readings = self.fetch(patient_id, start, end).await?;
        if readings.is_empty() {
            info!("no readings in lookback window");
            return Ok(RecentTrends::insufficient_data());
        }

        let mut trends = BTreeMap::new();
        for &metric in &self.config.trend_metrics {
            match self.trend_report(&readings, metric) {
                Ok(report) => {
                    trends.insert(metric, report);
                }
                Err(reason) => debug!(%reason, "metric omitted"),
            }
        }

        info!(
            readings = readings.len(),
            metrics = trends.len(),
            "analyzed recent trends"
        );

        Ok(RecentTrends {
            status: TrendStatus::Analyzed,
            trends,
        })
    }

    /// Distribution and trend strength of each requested metric between
    /// `start` and `end` inclusive.
    ///
    /// Returns an empty list when the window holds no readings, otherwise a
    /// single summary. Metrics without any value in the window are omitted.
    #[instrument(skip(self), fields(patient_id = %patient_id))]
    pub async fn summarize_history(
        &self,
        patient_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        metric_filter: Option<VitalMetric>,
    ) -> Result<Vec<HistorySummary>> {
        validate_window(start, end)?;

        let metrics = match metric_filter {
            Some(metric) => vec![metric],
            None => self.config.history_metrics.clone(),
        };

        let key = HistoryKey::new(patient_id, start, end, &metrics);
        if let Some(hit) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            debug!("history cache hit");
            return Ok(hit);
        }

        let readings = self.fetch(patient_id, start, end).await?;

        let summaries = if readings.is_empty() {
            info!("no readings in history window");
            Vec::new()
        } else {
            let reports = metrics
                .iter()
                .filter_map(|&metric| {
                    MetricSeries::extract(&readings, metric)
                        .map(|series| (metric, build_history_report(&series)))
                })
                .collect();

            vec![HistorySummary {
                metrics: reports,
                start_date: start,
                end_date: end,
                data_points: readings.len(),
            }]
        };

        if let Some(cache) = &self.cache {
            cache.insert(key, summaries.clone());
        }

        Ok(summaries)
    }

    /// Fetches and sorts oldest first, whatever order the store used.
    async fn fetch(
        &self,
        patient_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>> {
        let fetch = self.store.fetch_readings(patient_id, start, end);

        let mut readings = match self.config.fetch_timeout() {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| StoreError::Timeout(limit))??,
            None => fetch.await?,
        };

        readings.sort_by_key(|reading| reading.timestamp);
        debug!(count = readings.len(), "fetched readings");

        Ok(readings)
    }

    fn trend_report(
        &self,
        readings: &[Reading],
        metric: VitalMetric,
    ) -> std::result::Result<MetricTrendReport, AnalysisError> {
        let required = self.config.min_trend_points;

        match MetricSeries::extract(readings, metric) {
            Some(series) if series.len() >= required => {
                Ok(build_trend_report(&series, self.config.min_forecast_points))
            }
            series => Err(AnalysisError::MetricBelowThreshold {
                metric,
                points: series.map_or(0, |s| s.len()),
                required,
            }),
        }
    }
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start > end {
        return Err(EngineError::InvalidWindow { start, end });
    }
    Ok(())
}

pub fn build_trend_report(series: &MetricSeries, min_forecast_points: usize) -> MetricTrendReport {
    let summary = Summary::of(series);
    let fit = TrendFit::fit(series.values());

    MetricTrendReport {
        current_value: series.latest(),
        mean: summary.mean,
        std: summary.std,
        trend_direction: fit.direction(),
        volatility: summary.volatility(),
        forecast_next: forecast_next(series, min_forecast_points),
    }
}

pub fn build_history_report(series: &MetricSeries) -> MetricHistoryReport {
    let summary = Summary::of(series);

    MetricHistoryReport {
        min: summary.min,
        max: summary.max,
        mean: summary.mean,
        median: summary.median,
        std: summary.std,
        percentile_25: summary.percentile_25,
        percentile_75: summary.percentile_75,
        trend_strength: TrendFit::fit(series.values()).correlation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockReadingStore;
    use crate::models::TrendDirection;
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn reading(minute: i64) -> Reading {
        Reading::new("patient-1", at(minute))
    }

    fn engine(store: MockReadingStore) -> TrendEngine<MockReadingStore> {
        TrendEngine::new(store, AnalysisConfig::default())
    }

    fn store_returning(readings: Vec<Reading>) -> MockReadingStore {
        let mut store = MockReadingStore::new();
        store
            .expect_fetch_readings()
            .times(1)
            .returning(move |_, _, _| Ok(readings.clone()));
        store
    }

    #[tokio::test]
    async fn no_readings_is_insufficient_data() {
        let engine = engine(store_returning(Vec::new()));

        let result = engine.analyze_recent_trends("patient-1", None).await.unwrap();

        assert_eq!(result.status, TrendStatus::InsufficientData);
        assert!(result.trends.is_empty());
    }

    #[tokio::test]
    async fn metrics_below_three_points_are_omitted() {
        let readings: Vec<Reading> = (0..5)
            .map(|i| Reading {
                heart_rate: (i < 2).then(|| 70.0 + i as f64),
                oxygen_saturation: Some(97.0 - i as f64 * 0.5),
                ..reading(i * 10)
            })
            .collect();
        let engine = engine(store_returning(readings));

        let result = engine.analyze_recent_trends("patient-1", None).await.unwrap();

        assert_eq!(result.status, TrendStatus::Analyzed);
        assert_eq!(
            result.trends.keys().copied().collect::<Vec<_>>(),
            vec![VitalMetric::OxygenSaturation]
        );
    }

    #[tokio::test]
    async fn analyzed_even_when_every_metric_is_below_threshold() {
        let engine = engine(store_returning(vec![Reading {
            heart_rate: Some(80.0),
            ..reading(0)
        }]));

        let result = engine.analyze_recent_trends("patient-1", None).await.unwrap();

        assert_eq!(result.status, TrendStatus::Analyzed);
        assert!(result.trends.is_empty());
    }

    #[tokio::test]
    async fn newest_first_rows_are_normalized() {
        // store hands rows back newest first
        let readings: Vec<Reading> = (0..4)
            .rev()
            .map(|i| Reading {
                heart_rate: Some(70.0 + 5.0 * i as f64),
                ..reading(i * 15)
            })
            .collect();
        let engine = engine(store_returning(readings));

        let result = engine.analyze_recent_trends("patient-1", None).await.unwrap();
        let hr = &result.trends[&VitalMetric::HeartRate];

        assert_eq!(hr.current_value, 85.0);
        assert_eq!(hr.trend_direction, TrendDirection::Increasing);
        assert_eq!(hr.mean, 77.5);
        // four points: below the smoothing threshold
        assert_eq!(hr.forecast_next, 85.0);
    }

    #[tokio::test]
    async fn trend_report_uses_smoothing_with_enough_history() {
        let readings: Vec<Reading> = (0..10)
            .map(|i| Reading {
                blood_pressure_systolic: Some(110.0 + 2.0 * i as f64),
                ..reading(i * 5)
            })
            .collect();
        let engine = engine(store_returning(readings));

        let result = engine.analyze_recent_trends("patient-1", None).await.unwrap();
        let sbp = &result.trends[&VitalMetric::BloodPressureSystolic];

        assert_eq!(sbp.current_value, 128.0);
        assert!((sbp.forecast_next - 130.0).abs() < 1e-9);
        assert!(sbp.volatility > 0.0);
    }

    #[tokio::test]
    async fn negative_lookback_is_rejected_before_fetch() {
        let mut store = MockReadingStore::new();
        store.expect_fetch_readings().times(0);
        let engine = engine(store);

        let err = engine
            .analyze_recent_trends("patient-1", Some(Duration::hours(-1)))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidWindow { .. }));
    }

    #[tokio::test]
    async fn lookback_past_the_calendar_is_rejected_before_fetch() {
        let mut store = MockReadingStore::new();
        store.expect_fetch_readings().times(0);
        let engine = engine(store);

        let err = engine
            .analyze_recent_trends("patient-1", Some(Duration::weeks(50_000_000)))
            .await
            .unwrap_err();

        match err {
            EngineError::InvalidWindow { start, .. } => {
                assert_eq!(start, DateTime::<Utc>::MIN_UTC)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn default_lookback_comes_from_config() {
        let config = AnalysisConfig {
            lookback_hours: 8,
            ..AnalysisConfig::default()
        };
        let mut store = MockReadingStore::new();
        store
            .expect_fetch_readings()
            .withf(|_, start, end| *end - *start == Duration::hours(8))
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));
        let engine = TrendEngine::new(store, config);

        assert_eq!(engine.config().lookback(), Duration::hours(8));
        engine.analyze_recent_trends("patient-1", None).await.unwrap();
    }

    #[tokio::test]
    async fn lookback_defines_the_fetched_window() {
        let mut store = MockReadingStore::new();
        store
            .expect_fetch_readings()
            .withf(|_, start, end| *end - *start == Duration::hours(6))
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));
        let engine = engine(store);

        engine
            .analyze_recent_trends("patient-1", Some(Duration::hours(6)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn inverted_history_window_never_reaches_the_store() {
        let mut store = MockReadingStore::new();
        store.expect_fetch_readings().times(0);
        let engine = engine(store);

        let err = engine
            .summarize_history("patient-1", at(60), at(0), None)
            .await
            .unwrap_err();

        match err {
            EngineError::InvalidWindow { start, end } => {
                assert_eq!(start, at(60));
                assert_eq!(end, at(0));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn storage_failure_is_not_insufficient_data() {
        let mut store = MockReadingStore::new();
        store
            .expect_fetch_readings()
            .returning(|_, _, _| Err(StoreError::Corrupt("disk gone".to_string())));
        let engine = engine(store);

        let err = engine.analyze_recent_trends("patient-1", None).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::StorageUnavailable(StoreError::Corrupt(_))
        ));

        let err = engine
            .summarize_history("patient-1", at(0), at(60), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::StorageUnavailable(_)));
    }

    struct SlowStore;

    #[async_trait]
    impl ReadingStore for SlowStore {
        async fn fetch_readings(
            &self,
            _patient_id: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> std::result::Result<Vec<Reading>, StoreError> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn slow_fetch_times_out_as_storage_unavailable() {
        let config = AnalysisConfig {
            fetch_timeout_ms: 20,
            ..AnalysisConfig::default()
        };
        let engine = TrendEngine::new(SlowStore, config);

        let err = engine.analyze_recent_trends("patient-1", None).await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::StorageUnavailable(StoreError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn empty_history_window_returns_empty_list() {
        let engine = engine(store_returning(Vec::new()));

        let result = engine
            .summarize_history("patient-1", at(0), at(60), None)
            .await
            .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn history_summarizes_every_metric_with_data() {
        let readings: Vec<Reading> = (1..=5)
            .map(|i| Reading {
                heart_rate: Some(i as f64),
                oxygen_saturation: (i == 3).then_some(95.0),
                temperature: Some(37.0),
                ..reading(i * 10)
            })
            .collect();
        let engine = engine(store_returning(readings));

        let result = engine
            .summarize_history("patient-1", at(0), at(60), None)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        let summary = &result[0];
        assert_eq!(summary.data_points, 5);
        assert_eq!(summary.start_date, at(0));
        assert_eq!(summary.end_date, at(60));

        // temperature is not in the default history set
        assert_eq!(
            summary.metrics.keys().copied().collect::<Vec<_>>(),
            vec![VitalMetric::HeartRate, VitalMetric::OxygenSaturation]
        );

        let hr = &summary.metrics[&VitalMetric::HeartRate];
        assert_eq!(hr.percentile_25, 2.0);
        assert_eq!(hr.median, 3.0);
        assert_eq!(hr.percentile_75, 4.0);
        assert!((hr.trend_strength - 1.0).abs() < 1e-12);

        let spo2 = &summary.metrics[&VitalMetric::OxygenSaturation];
        assert_eq!(spo2.min, 95.0);
        assert_eq!(spo2.std, 0.0);
        assert_eq!(spo2.trend_strength, 0.0);
    }

    #[tokio::test]
    async fn metric_filter_limits_the_report() {
        let readings = vec![Reading {
            heart_rate: Some(72.0),
            temperature: Some(37.2),
            ..reading(0)
        }];
        let engine = engine(store_returning(readings));

        let result = engine
            .summarize_history("patient-1", at(0), at(60), Some(VitalMetric::Temperature))
            .await
            .unwrap();

        assert_eq!(
            result[0].metrics.keys().copied().collect::<Vec<_>>(),
            vec![VitalMetric::Temperature]
        );
        assert_eq!(result[0].data_points, 1);
    }

    #[tokio::test]
    async fn cached_history_is_served_only_for_the_same_window() {
        let mut store = MockReadingStore::new();
        store
            .expect_fetch_readings()
            .times(2)
            .returning(|_, _, _| {
                Ok(vec![Reading {
                    heart_rate: Some(72.0),
                    ..Reading::new("patient-1", Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap())
                }])
            });
        let config = AnalysisConfig {
            cache_ttl_secs: 300,
            ..AnalysisConfig::default()
        };
        let engine = TrendEngine::new(store, config);

        let first = engine
            .summarize_history("patient-1", at(0), at(60), None)
            .await
            .unwrap();
        let second = engine
            .summarize_history("patient-1", at(0), at(60), None)
            .await
            .unwrap();
        assert_eq!(first, second);

        // shifted window goes back to the store
        engine
            .summarize_history("patient-1", at(1), at(60), None)
            .await
            .unwrap();
    }

    #[test]
    fn trend_report_of_constant_series() {
        let series = MetricSeries::new(vec![98.0; 7]).unwrap();
        let report = build_trend_report(&series, 5);

        assert_eq!(report.trend_direction, TrendDirection::Decreasing);
        assert_eq!(report.std, 0.0);
        assert_eq!(report.volatility, 0.0);
        assert_eq!(report.forecast_next, 98.0);
    }
}
