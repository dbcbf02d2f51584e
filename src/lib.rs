//! Vital-sign trend engine
//!
//! Derives trend direction, short-horizon forecasts and distributional
//! summaries from a patient's recent vital-sign readings.

pub mod core;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;

pub use db::{ReadingStore, SqliteReadingStore};
pub use engine::TrendEngine;
pub use error::{EngineError, StoreError};

/// Application configuration
pub mod config {
    use std::time::Duration;

    use serde::Deserialize;

    use crate::models::VitalMetric;

    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct Config {
        #[serde(default)]
        pub database: DatabaseConfig,
        #[serde(default)]
        pub analysis: AnalysisConfig,
        #[serde(default)]
        pub logging: LoggingConfig,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct DatabaseConfig {
        #[serde(default = "default_database_url")]
        pub url: String,
        #[serde(default = "default_max_connections")]
        pub max_connections: u32,
    }

    /// Tuning for [`crate::engine::TrendEngine`].
    #[derive(Debug, Clone, Deserialize)]
    pub struct AnalysisConfig {
        /// Default trailing window for recent-trend analysis.
        #[serde(default = "default_lookback_hours")]
        pub lookback_hours: i64,
        /// Values a metric needs before it gets a trend report.
        #[serde(default = "default_min_trend_points")]
        pub min_trend_points: usize,
        /// Values a metric needs before the forecast is smoothed rather than
        /// the last observation.
        #[serde(default = "default_min_forecast_points")]
        pub min_forecast_points: usize,
        /// 0 disables the fetch timeout.
        #[serde(default = "default_fetch_timeout_ms")]
        pub fetch_timeout_ms: u64,
        #[serde(default = "default_trend_metrics")]
        pub trend_metrics: Vec<VitalMetric>,
        #[serde(default = "default_history_metrics")]
        pub history_metrics: Vec<VitalMetric>,
        /// 0 disables the history cache.
        #[serde(default)]
        pub cache_ttl_secs: u64,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct LoggingConfig {
        #[serde(default = "default_log_level")]
        pub level: String,
        #[serde(default)]
        pub json: bool,
    }

    fn default_database_url() -> String {
        "sqlite://vitals.db".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    fn default_lookback_hours() -> i64 {
        24
    }

    fn default_min_trend_points() -> usize {
        3
    }

    fn default_min_forecast_points() -> usize {
        5
    }

    fn default_fetch_timeout_ms() -> u64 {
        5_000
    }

    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_trend_metrics() -> Vec<VitalMetric> {
        vec![
            VitalMetric::HeartRate,
            VitalMetric::BloodPressureSystolic,
            VitalMetric::OxygenSaturation,
        ]
    }

    fn default_history_metrics() -> Vec<VitalMetric> {
        vec![
            VitalMetric::HeartRate,
            VitalMetric::BloodPressureSystolic,
            VitalMetric::BloodPressureDiastolic,
            VitalMetric::OxygenSaturation,
        ]
    }

    impl Default for DatabaseConfig {
        fn default() -> Self {
            Self {
                url: default_database_url(),
                max_connections: default_max_connections(),
            }
        }
    }

    impl Default for AnalysisConfig {
        fn default() -> Self {
            Self {
                lookback_hours: default_lookback_hours(),
                min_trend_points: default_min_trend_points(),
                min_forecast_points: default_min_forecast_points(),
                fetch_timeout_ms: default_fetch_timeout_ms(),
                trend_metrics: default_trend_metrics(),
                history_metrics: default_history_metrics(),
                cache_ttl_secs: 0,
            }
        }
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: default_log_level(),
                json: false,
            }
        }
    }

    impl AnalysisConfig {
        pub fn lookback(&self) -> chrono::Duration {
            chrono::Duration::hours(self.lookback_hours)
        }

        pub fn fetch_timeout(&self) -> Option<Duration> {
            (self.fetch_timeout_ms > 0).then(|| Duration::from_millis(self.fetch_timeout_ms))
        }

        pub fn cache_ttl(&self) -> Option<Duration> {
            (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
        }
    }

    /// Load configuration from `base` (default `config/default`), then
    /// `config/{VITALS_ENV}`, then `VITALS_*` environment variables.
    pub fn load_config(base: Option<&str>) -> Result<Config, ::config::ConfigError> {
        let env = std::env::var("VITALS_ENV").unwrap_or_else(|_| "development".into());

        ::config::Config::builder()
            // An explicitly named file must exist
            .add_source(
                ::config::File::with_name(base.unwrap_or("config/default"))
                    .required(base.is_some()),
            )
            .add_source(::config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(::config::Environment::with_prefix("VITALS").separator("__"))
            .build()?
            .try_deserialize()
    }

}
