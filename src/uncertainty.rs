//! Time-varying uncertainty estimation from residual spread.
//!
//! A rolling standard deviation of the post-outlier residuals, scaled by a
//! configured z-score, becomes the target of a second (typically simpler)
//! model, letting the band width itself carry seasonal structure.

use crate::calendar::TimezoneProvider;
use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureConfig, GrowthType, SeasonalityConfig};
use crate::model::{ForecastModel, ModelOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum usable rolling-window width.
const MIN_WINDOW: usize = 2;

/// Configuration for the uncertainty band model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyOptions {
    /// Multiplier on the rolling standard deviation; 1.96 covers ~95% for
    /// Gaussian residuals.
    pub z_score: f64,
    /// Requested rolling-window width in samples; auto-shrunk to at most a
    /// quarter of the residual length and at least 2.
    pub window: usize,
    /// Options for the secondary model fit on the half-band series.
    pub model: ModelOptions,
}

impl Default for UncertaintyOptions {
    /// A simpler model than the series default: flat growth and low-order
    /// daily/weekly harmonics.
    fn default() -> Self {
        Self {
            z_score: 1.96,
            window: 30,
            model: ModelOptions::default().with_features(
                FeatureConfig::default()
                    .with_growth(GrowthType::Flat)
                    .with_seasonalities(vec![
                        SeasonalityConfig::daily(3),
                        SeasonalityConfig::weekly(2),
                    ]),
            ),
        }
    }
}

/// Fit the uncertainty model on a residual series.
///
/// Non-finite residuals (masked outliers, missing rows) are dropped first.
/// The trailing rolling standard deviation has a group delay of half the
/// window, so each value is paired with the timestamp `window/2` samples
/// back before fitting.
pub fn fit_uncertainty(
    timestamps: &[DateTime<Utc>],
    residuals: &[f64],
    options: &UncertaintyOptions,
    timezones: &dyn TimezoneProvider,
) -> Result<ForecastModel> {
    if timestamps.len() != residuals.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: timestamps.len(),
            got: residuals.len(),
        });
    }
    if !options.z_score.is_finite() || options.z_score < 0.0 {
        return Err(ForecastError::InvalidParameter(format!(
            "z_score must be finite and non-negative, got {}",
            options.z_score
        )));
    }

    let mut times = Vec::with_capacity(timestamps.len());
    let mut values = Vec::with_capacity(residuals.len());
    for (t, &r) in timestamps.iter().zip(residuals.iter()) {
        if r.is_finite() {
            times.push(*t);
            values.push(r);
        }
    }

    let n = values.len();
    let window = options.window.min(n / 4).max(MIN_WINDOW);
    if n <= window {
        return Err(ForecastError::InsufficientData {
            needed: window + 1,
            got: n,
        });
    }

    let spread = rolling_std(&values, window);
    debug!(window, points = n, "estimating uncertainty band");

    // Align for the rolling statistic's group delay.
    let delay = window / 2;
    let mut band_times = Vec::with_capacity(n - window + 1);
    let mut band_values = Vec::with_capacity(n - window + 1);
    for i in (window - 1)..n {
        band_times.push(times[i - delay]);
        band_values.push(options.z_score * spread[i]);
    }

    let band_series = TimeSeries::new(band_times, band_values)?;
    let mut model = ForecastModel::new(options.model.clone());
    model.fit(&band_series, timezones)?;
    Ok(model)
}

/// Predict half-band widths, floored at zero.
pub fn predict_band(
    model: &ForecastModel,
    timestamps: &[DateTime<Utc>],
    timezones: &dyn TimezoneProvider,
) -> Result<Vec<f64>> {
    let prediction = model.predict(timestamps, timezones)?;
    Ok(prediction.forecast.iter().map(|b| b.max(0.0)).collect())
}

/// Trailing rolling sample standard deviation; positions before the first
/// full window are NaN.
fn rolling_std(series: &[f64], window: usize) -> Vec<f64> {
    let n = series.len();
    let mut out = vec![f64::NAN; n];
    if window < 2 {
        return out;
    }
    for i in (window - 1)..n {
        let segment = &series[(i + 1 - window)..=i];
        let mean = segment.iter().sum::<f64>() / window as f64;
        let var = segment.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>()
            / (window - 1) as f64;
        out[i] = var.sqrt();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::UtcOnly;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::hours(i as i64)).collect()
    }

    #[test]
    fn rolling_std_of_constant_is_zero() {
        let out = rolling_std(&[3.0; 10], 4);
        assert!(out[2].is_nan());
        for v in &out[3..] {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn rolling_std_matches_direct_computation() {
        let series = vec![1.0, 2.0, 4.0, 8.0, 16.0];
        let out = rolling_std(&series, 3);

        // Window [1, 2, 4]: mean 7/3, sample variance 7/3.
        assert_relative_eq!(out[2], (7.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert!(out[0].is_nan() && out[1].is_nan());
    }

    #[test]
    fn window_shrinks_for_short_series() {
        let timestamps = make_timestamps(20);
        let residuals: Vec<f64> = (0..20).map(|i| (i as f64 * 0.7).sin()).collect();

        // Requested window 30 must shrink to 20/4 = 5.
        let model = fit_uncertainty(
            &timestamps,
            &residuals,
            &UncertaintyOptions::default(),
            &UtcOnly,
        )
        .unwrap();
        assert!(model.is_fitted());
    }

    #[test]
    fn gaussian_noise_band_tracks_sigma() {
        let n = 600;
        let sigma = 2.5;
        let z = 1.96;
        let timestamps = make_timestamps(n);
        let normal = Normal::new(0.0, sigma).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let residuals: Vec<f64> = (0..n).map(|_| normal.sample(&mut rng)).collect();

        let options = UncertaintyOptions {
            z_score: z,
            window: 50,
            ..Default::default()
        };
        let model = fit_uncertainty(&timestamps, &residuals, &options, &UtcOnly).unwrap();
        let band = predict_band(&model, &timestamps, &UtcOnly).unwrap();

        let mean_band = band.iter().sum::<f64>() / band.len() as f64;
        assert_relative_eq!(mean_band, z * sigma, epsilon = z * sigma * 0.2);
        assert!(band.iter().all(|b| *b >= 0.0));
    }

    #[test]
    fn masked_residuals_are_skipped() {
        let timestamps = make_timestamps(80);
        let mut residuals: Vec<f64> = (0..80).map(|i| (i as f64 * 0.3).cos()).collect();
        for i in (0..80).step_by(7) {
            residuals[i] = f64::NAN;
        }

        let model = fit_uncertainty(
            &timestamps,
            &residuals,
            &UncertaintyOptions::default(),
            &UtcOnly,
        )
        .unwrap();
        assert!(model.is_fitted());
    }

    #[test]
    fn too_short_series_rejected() {
        let timestamps = make_timestamps(2);
        let residuals = vec![0.1, 0.2];
        let result = fit_uncertainty(
            &timestamps,
            &residuals,
            &UncertaintyOptions::default(),
            &UtcOnly,
        );
        assert!(matches!(
            result,
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn negative_z_score_rejected() {
        let timestamps = make_timestamps(40);
        let residuals = vec![0.5; 40];
        let options = UncertaintyOptions {
            z_score: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            fit_uncertainty(&timestamps, &residuals, &options, &UtcOnly),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn length_mismatch_rejected() {
        let timestamps = make_timestamps(10);
        let residuals = vec![0.1; 9];
        assert!(matches!(
            fit_uncertainty(
                &timestamps,
                &residuals,
                &UncertaintyOptions::default(),
                &UtcOnly
            ),
            Err(ForecastError::DimensionMismatch { .. })
        ));
    }
}
