//! One-step-ahead forecasting.
//!
//! Series with enough history get Holt's linear (additive trend, no season)
//! exponential smoothing. Anything shorter, or any series the fit cannot
//! handle, is forecast as its most recent value.

use tracing::debug;

use crate::error::AnalysisError;
use crate::models::MetricSeries;

/// Grid resolution for the first pass over (alpha, beta).
const COARSE_STEP: f64 = 0.05;
/// Grid resolution around the best coarse cell.
const FINE_STEP: f64 = 0.005;

/// Holt's linear method fitted by minimising one-step-ahead squared error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoltFit {
    pub alpha: f64,
    pub beta: f64,
    pub level: f64,
    pub trend: f64,
    pub sse: f64,
}

impl HoltFit {
    /// Fits oldest-first `values`, initialising level at the first value and
    /// trend at the first difference.
    pub fn fit(values: &[f64]) -> Result<Self, AnalysisError> {
        if values.len() < 2 {
            return Err(AnalysisError::NumericDegenerate("fewer than two points"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::NumericDegenerate("non-finite input"));
        }
        if values.iter().all(|&v| v == values[0]) {
            return Err(AnalysisError::NumericDegenerate("constant series"));
        }

        let coarse = search(values, (0.0, 1.0), (0.0, 1.0), COARSE_STEP)
            .ok_or(AnalysisError::NumericDegenerate("no finite fit on coarse grid"))?;

        let alpha_range = (coarse.alpha - COARSE_STEP, coarse.alpha + COARSE_STEP);
        let beta_range = (coarse.beta - COARSE_STEP, coarse.beta + COARSE_STEP);
        let best = match search(values, alpha_range, beta_range, FINE_STEP) {
            Some(fine) if fine.sse < coarse.sse => fine,
            _ => coarse,
        };

        if !best.forecast(1).is_finite() {
            return Err(AnalysisError::NumericDegenerate("non-finite forecast"));
        }

        Ok(best)
    }

    /// Forecast `steps` ahead of the last observation.
    pub fn forecast(&self, steps: usize) -> f64 {
        self.level + steps as f64 * self.trend
    }
}

/// Next value of `series`: smoothed when it has at least `min_points`
/// observations, otherwise (or when the fit degenerates) its latest value.
pub fn forecast_next(series: &MetricSeries, min_points: usize) -> f64 {
    if series.len() < min_points.max(2) {
        return series.latest();
    }

    match HoltFit::fit(series.values()) {
        Ok(fit) => fit.forecast(1),
        Err(reason) => {
            debug!(%reason, points = series.len(), "falling back to last observed value");
            series.latest()
        }
    }
}

fn search(values: &[f64], alpha: (f64, f64), beta: (f64, f64), step: f64) -> Option<HoltFit> {
    let mut best: Option<HoltFit> = None;

    for a in grid(alpha, step) {
        for b in grid(beta, step) {
            let candidate = smooth(values, a, b);
            if !candidate.sse.is_finite() {
                continue;
            }
            if best.map_or(true, |current| candidate.sse < current.sse) {
                best = Some(candidate);
            }
        }
    }

    best
}

/// Points from `lo` to `hi` inclusive, clipped to [0, 1].
fn grid((lo, hi): (f64, f64), step: f64) -> impl Iterator<Item = f64> {
    let lo = lo.max(0.0);
    let hi = hi.min(1.0);
    let count = ((hi - lo) / step).round() as usize;
    (0..=count).map(move |i| (lo + i as f64 * step).min(1.0))
}

fn smooth(values: &[f64], alpha: f64, beta: f64) -> HoltFit {
    let mut level = values[0];
    let mut trend = values[1] - values[0];
    let mut sse = 0.0;

    for &y in &values[1..] {
        let predicted = level + trend;
        sse += (y - predicted).powi(2);

        let next_level = alpha * y + (1.0 - alpha) * predicted;
        trend = beta * (next_level - level) + (1.0 - beta) * trend;
        level = next_level;
    }

    HoltFit {
        alpha,
        beta,
        level,
        trend,
        sse,
    }
}
