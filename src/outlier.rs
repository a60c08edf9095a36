//! Outlier-robust refitting: Tukey inter-percentile detection plus an
//! iterative mask-and-refit loop.

use crate::calendar::TimezoneProvider;
use crate::core::TimeSeries;
use crate::error::Result;
use crate::model::{ForecastModel, ModelOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for outlier detection and the refinement loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierOptions {
    /// Number of detect-and-mask passes after the initial fit. The loop
    /// fits at most `num_passes + 1` times.
    pub num_passes: usize,
    /// Scale factor on the inner percentile range; clamped to >= 0.
    pub tukey_factor: f64,
    /// Lower percentile rank; clamped to [0, 1].
    pub lower_percentile: f64,
    /// Upper percentile rank; clamped to [0, 1].
    pub upper_percentile: f64,
}

impl Default for OutlierOptions {
    fn default() -> Self {
        Self {
            num_passes: 3,
            tukey_factor: 1.0,
            lower_percentile: 0.1,
            upper_percentile: 0.9,
        }
    }
}

/// Detect residual outliers with Tukey's method.
///
/// Residuals are sorted; the values at the configured percentile ranks give
/// an inner range, and anything outside `[lower - k*range, upper + k*range]`
/// is flagged. Non-finite residuals are ignored. Returns indices into the
/// input slice.
pub fn detect_outliers(residuals: &[f64], options: &OutlierOptions) -> Vec<usize> {
    let mut sorted: Vec<f64> = residuals.iter().copied().filter(|r| r.is_finite()).collect();
    if sorted.len() < 2 {
        return Vec::new();
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite residuals"));

    let n = sorted.len();
    let lower_rank = options.lower_percentile.clamp(0.0, 1.0);
    let upper_rank = options.upper_percentile.clamp(0.0, 1.0);
    let lower_idx = ((n as f64 * lower_rank).floor() as usize).min(n - 1);
    let upper_idx = ((n as f64 * upper_rank).ceil() as usize).min(n - 1);

    let lower = sorted[lower_idx];
    let upper = sorted[upper_idx];
    let range = upper - lower;
    let k = options.tukey_factor.max(0.0);

    let low_fence = lower - k * range;
    let high_fence = upper + k * range;

    residuals
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_finite() && (**r < low_fence || **r > high_fence))
        .map(|(i, _)| i)
        .collect()
}

/// Fit a model, masking residual outliers between passes.
///
/// Operates on an owned copy of the series; the caller's data is never
/// touched. Returns the final fitted model together with the masked series
/// it was trained on. Stops early once a pass flags nothing new.
pub fn refine(
    series: &TimeSeries,
    model_options: &ModelOptions,
    options: &OutlierOptions,
    timezones: &dyn TimezoneProvider,
) -> Result<(ForecastModel, TimeSeries)> {
    let mut working = series.clone();

    for pass in 0..=options.num_passes {
        let mut model = ForecastModel::new(model_options.clone());
        model.fit(&working, timezones)?;

        if pass == options.num_passes {
            return Ok((model, working));
        }

        let predicted = model.predict(working.timestamps(), timezones)?;
        let residuals: Vec<f64> = working
            .values()
            .iter()
            .zip(predicted.forecast.iter())
            .map(|(actual, forecast)| actual - forecast)
            .collect();

        let flagged = detect_outliers(&residuals, options);
        if flagged.is_empty() {
            debug!(pass, "outlier refinement converged");
            return Ok((model, working));
        }

        debug!(pass, flagged = flagged.len(), "masking residual outliers");
        let values = working.values_mut();
        for &idx in &flagged {
            values[idx] = f64::NAN;
        }
    }

    unreachable!("loop always returns on its final pass")
}
