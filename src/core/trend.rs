use crate::models::TrendDirection;

/// Ordinary least-squares line through `(i, values[i])`, `i = 0..n`, with the
/// Pearson correlation between index and value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    pub correlation: f64,
}

impl TrendFit {
    /// Fits oldest-first `values`. Fewer than two points, or no variance in
    /// the values, give a flat line with correlation 0.0.
    pub fn fit(values: &[f64]) -> Self {
        let n = values.len();
        if n < 2 {
            return Self {
                slope: 0.0,
                intercept: values.first().copied().unwrap_or(0.0),
                correlation: 0.0,
            };
        }

        let mean_x = (n as f64 - 1.0) / 2.0;
        let mean_y = values.iter().sum::<f64>() / n as f64;

        let mut sxy = 0.0;
        let mut sxx = 0.0;
        let mut syy = 0.0;

        for (i, &y) in values.iter().enumerate() {
            let dx = i as f64 - mean_x;
            let dy = y - mean_y;
            sxy += dx * dy;
            sxx += dx * dx;
            syy += dy * dy;
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        // 0/0 when the values are constant
        let correlation = if syy > 0.0 {
            (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        Self {
            slope,
            intercept,
            correlation,
        }
    }

    /// A zero slope counts as decreasing.
    pub fn direction(&self) -> TrendDirection {
        if self.slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    }
}
