//! Prediction result structure holding point forecasts, uncertainty bands,
//! and the additive component breakdown.

use chrono::{DateTime, Utc};

/// A prediction over a set of timestamps.
///
/// All arrays are aligned with `timestamps`. The component arrays sum (with
/// the intercept folded into `trend`) to the point forecast in the fitting
/// domain; when a log transform is configured the point forecast and band
/// edges are reported in the original domain.
#[derive(Debug, Clone, Default)]
pub struct Prediction {
    /// Timestamps the prediction was evaluated at, in the order given.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Point forecast.
    pub forecast: Vec<f64>,
    /// Upper edge of the uncertainty band (empty when no uncertainty model).
    pub upper: Vec<f64>,
    /// Lower edge of the uncertainty band (empty when no uncertainty model).
    pub lower: Vec<f64>,
    /// Growth plus changepoint contributions.
    pub trend: Vec<f64>,
    /// Fourier seasonality contributions.
    pub seasonality: Vec<f64>,
    /// Event, holiday, and weekend contributions.
    pub event: Vec<f64>,
}

impl Prediction {
    /// Number of predicted points.
    pub fn len(&self) -> usize {
        self.forecast.len()
    }

    /// Whether the prediction holds any points.
    pub fn is_empty(&self) -> bool {
        self.forecast.is_empty()
    }

    /// Whether band edges are present.
    pub fn has_band(&self) -> bool {
        !self.upper.is_empty() && !self.lower.is_empty()
    }
}
