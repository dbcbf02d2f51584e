//! vitals-trend
//!
//! Command line front end for the vital-sign trend engine.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vitals_trend::config::{self, LoggingConfig};
use vitals_trend::models::{Reading, VitalMetric};
use vitals_trend::{SqliteReadingStore, TrendEngine};

#[derive(Parser)]
#[command(name = "vitals-trend", version, about = "Vital-sign trends, forecasts and summaries")]
struct Cli {
    /// Base configuration file (defaults to config/default)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trend and forecast per metric over the trailing window
    Trends {
        patient_id: String,
        /// Lookback in hours (defaults to the configured window)
        #[arg(long)]
        hours: Option<i64>,
    },
    /// Distribution summary per metric over an explicit window
    History {
        patient_id: String,
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
        #[arg(long)]
        metric: Option<VitalMetric>,
    },
    /// Record a reading and report the refreshed trends
    Record {
        patient_id: String,
        /// Observation time (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        #[arg(long)]
        heart_rate: Option<f64>,
        #[arg(long)]
        systolic: Option<f64>,
        #[arg(long)]
        diastolic: Option<f64>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        spo2: Option<f64>,
        #[arg(long)]
        respiratory_rate: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config =
        config::load_config(cli.config.as_deref()).context("failed to load configuration")?;

    init_tracing(&config.logging);
    info!("Starting vitals-trend v{}", env!("CARGO_PKG_VERSION"));

    let store = SqliteReadingStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("failed to connect to reading store")?;
    store
        .initialize_schema()
        .await
        .context("failed to initialize reading store schema")?;

    let engine = TrendEngine::new(store, config.analysis);

    let output = match cli.command {
        Commands::Trends { patient_id, hours } => {
            let lookback = hours
                .map(|hours| {
                    Duration::try_hours(hours)
                        .with_context(|| format!("--hours {} is out of range", hours))
                })
                .transpose()?;
            let trends = engine.analyze_recent_trends(&patient_id, lookback).await?;
            serde_json::to_value(trends)?
        }
        Commands::History {
            patient_id,
            start,
            end,
            metric,
        } => {
            let summaries = engine
                .summarize_history(&patient_id, start, end, metric)
                .await?;
            serde_json::to_value(summaries)?
        }
        Commands::Record {
            patient_id,
            at,
            heart_rate,
            systolic,
            diastolic,
            temperature,
            spo2,
            respiratory_rate,
        } => {
            let reading = Reading {
                heart_rate,
                blood_pressure_systolic: systolic,
                blood_pressure_diastolic: diastolic,
                temperature,
                oxygen_saturation: spo2,
                respiratory_rate,
                ..Reading::new(patient_id.as_str(), at.unwrap_or_else(Utc::now))
            };

            let id = engine
                .store()
                .record_reading(&reading)
                .await
                .context("failed to record reading")?;
            let trends = engine.analyze_recent_trends(&patient_id, None).await?;

            json!({
                "id": id,
                "status": "recorded",
                "trends": trends,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
