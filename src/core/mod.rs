//! Pure numeric building blocks used by the trend engine.

pub mod forecast;
pub mod stats;
pub mod trend;

pub use forecast::{forecast_next, HoltFit};
pub use stats::Summary;
pub use trend::TrendFit;
