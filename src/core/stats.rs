//! Distributional summary of a single metric.
//!
//! Standard deviation is the sample estimator (divisor n - 1); a single
//! observation has no spread and reports 0.0. Quantiles interpolate linearly
//! between order statistics at rank `q * (n - 1)`.

use crate::models::MetricSeries;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub percentile_25: f64,
    pub percentile_75: f64,
}

impl Summary {
    pub fn of(series: &MetricSeries) -> Self {
        let values = series.values();
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mean = mean(values);

        Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean,
            median: quantile_sorted(&sorted, 0.5),
            std: sample_std(values, mean),
            percentile_25: quantile_sorted(&sorted, 0.25),
            percentile_75: quantile_sorted(&sorted, 0.75),
        }
    }

    /// std / mean, or 0.0 when the mean is zero.
    pub fn volatility(&self) -> f64 {
        if self.mean != 0.0 {
            self.std / self.mean
        } else {
            0.0
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// `q`-quantile of ascending `sorted`, which must be non-empty. Values are
/// expected to be finite, as [`MetricSeries`] guarantees; a NaN yields an
/// unspecified result rather than a panic.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    let (low, high) = (sorted[lower], sorted[upper]);
    let frac = rank - lower as f64;

    // keep rounding from stepping outside the bracketing order statistics
    (low + (high - low) * frac).max(low).min(high)
}
