//! Top-level orchestration: outlier-robust series fit plus uncertainty band.

use crate::calendar::{TimezoneProvider, UtcOnly};
use crate::core::{Prediction, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::metrics::Scores;
use crate::model::{ForecastModel, ModelOptions, ModelRecord};
use crate::outlier::{refine, OutlierOptions};
use crate::uncertainty::{fit_uncertainty, predict_band, UncertaintyOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Full configuration for a `Forecaster`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastOptions {
    /// Options for the series model.
    pub series: ModelOptions,
    /// Outlier detection and refinement-loop options.
    pub outlier: OutlierOptions,
    /// Uncertainty band options.
    pub uncertainty: UncertaintyOptions,
}

/// The persisted artifact of a fitted `Forecaster`: both sub-model records
/// plus the orchestration options, enabling inference without retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecasterModel {
    pub outlier: OutlierOptions,
    pub z_score: f64,
    pub residual_window: usize,
    pub series: ModelRecord,
    pub uncertainty: ModelRecord,
}

impl ForecasterModel {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ForecastError::ModelRecord(format!("serialize: {e}")))
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ForecastError::ModelRecord(format!("deserialize: {e}")))
    }
}

/// Fits and predicts one series: outlier-masked additive model, residual
/// uncertainty band, and a serializable model artifact.
pub struct Forecaster {
    options: ForecastOptions,
    timezones: Arc<dyn TimezoneProvider + Send + Sync>,
    series_model: Option<ForecastModel>,
    uncertainty_model: Option<ForecastModel>,
    training: Option<Prediction>,
}

impl fmt::Debug for Forecaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forecaster")
            .field("options", &self.options)
            .field("series_model", &self.series_model)
            .field("uncertainty_model", &self.uncertainty_model)
            .finish_non_exhaustive()
    }
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(ForecastOptions::default())
    }
}

impl Forecaster {
    /// Create an unfitted forecaster resolving timezones as UTC only.
    pub fn new(options: ForecastOptions) -> Self {
        Self {
            options,
            timezones: Arc::new(UtcOnly),
            series_model: None,
            uncertainty_model: None,
            training: None,
        }
    }

    /// Replace the timezone provider (for DST adjustment and weekend
    /// timezone overrides).
    pub fn with_timezone_provider(
        mut self,
        timezones: Arc<dyn TimezoneProvider + Send + Sync>,
    ) -> Self {
        self.timezones = timezones;
        self
    }

    pub fn options(&self) -> &ForecastOptions {
        &self.options
    }

    pub fn is_fitted(&self) -> bool {
        self.series_model.is_some() && self.uncertainty_model.is_some()
    }

    /// Fit on paired timestamps and values. Values may contain NaN for
    /// missing observations; the input is copied, never mutated.
    pub fn fit(&mut self, timestamps: &[DateTime<Utc>], values: &[f64]) -> Result<()> {
        let series = TimeSeries::from_slices(timestamps, values)?;

        let (series_model, masked) = refine(
            &series,
            &self.options.series,
            &self.options.outlier,
            self.timezones.as_ref(),
        )?;

        // Fitting-domain residuals of the cleaned series feed the band model.
        let raw = series_model.predict_raw(masked.timestamps(), self.timezones.as_ref())?;
        let transform = series_model.options().transform;
        let residuals: Vec<f64> = masked
            .values()
            .iter()
            .zip(raw.forecast.iter())
            .map(|(&v, &p)| transform.apply(v) - p)
            .collect();

        let uncertainty_model = fit_uncertainty(
            masked.timestamps(),
            &residuals,
            &self.options.uncertainty,
            self.timezones.as_ref(),
        )?;

        debug!(
            masked = masked.len() - masked.observed_len(),
            "forecaster fit complete"
        );

        self.series_model = Some(series_model);
        self.uncertainty_model = Some(uncertainty_model);
        self.training = Some(self.predict(timestamps)?);
        Ok(())
    }

    /// Predict the forecast, band edges, and component breakdown for
    /// arbitrary timestamps.
    pub fn predict(&self, timestamps: &[DateTime<Utc>]) -> Result<Prediction> {
        let series_model = self.series_model.as_ref().ok_or(ForecastError::FitRequired)?;
        let uncertainty_model = self
            .uncertainty_model
            .as_ref()
            .ok_or(ForecastError::FitRequired)?;

        let raw = series_model.predict_raw(timestamps, self.timezones.as_ref())?;
        let band = predict_band(uncertainty_model, timestamps, self.timezones.as_ref())?;
        let transform = series_model.options().transform;

        let mut forecast = Vec::with_capacity(timestamps.len());
        let mut upper = Vec::with_capacity(timestamps.len());
        let mut lower = Vec::with_capacity(timestamps.len());
        for (&point, &half_band) in raw.forecast.iter().zip(band.iter()) {
            forecast.push(transform.invert(point));
            upper.push(transform.invert(point + half_band));
            lower.push(transform.invert(point - half_band));
        }

        Ok(Prediction {
            timestamps: timestamps.to_vec(),
            forecast,
            upper,
            lower,
            trend: raw.trend,
            seasonality: raw.seasonality,
            event: raw.event,
        })
    }

    /// Cached predictions over the training timestamps.
    pub fn training_predictions(&self) -> Option<&Prediction> {
        self.training.as_ref()
    }

    /// Fit quality of the series model.
    pub fn scores(&self) -> Option<Scores> {
        self.series_model.as_ref().and_then(|m| m.scores())
    }

    /// Fit quality of the uncertainty model.
    pub fn uncertainty_scores(&self) -> Option<Scores> {
        self.uncertainty_model.as_ref().and_then(|m| m.scores())
    }

    /// Learned series-model coefficients in canonical order.
    pub fn coefficients(&self) -> Result<Vec<(crate::features::Feature, f64)>> {
        self.series_model
            .as_ref()
            .ok_or(ForecastError::FitRequired)?
            .coefficients()
    }

    /// Human-readable series-model equation.
    pub fn equation(&self) -> Result<String> {
        self.series_model
            .as_ref()
            .ok_or(ForecastError::FitRequired)?
            .equation()
    }

    /// Serialize the fitted forecaster into its persistable artifact.
    pub fn model(&self) -> Result<ForecasterModel> {
        let series_model = self.series_model.as_ref().ok_or(ForecastError::FitRequired)?;
        let uncertainty_model = self
            .uncertainty_model
            .as_ref()
            .ok_or(ForecastError::FitRequired)?;

        Ok(ForecasterModel {
            outlier: self.options.outlier.clone(),
            z_score: self.options.uncertainty.z_score,
            residual_window: self.options.uncertainty.window,
            series: series_model.to_record()?,
            uncertainty: uncertainty_model.to_record()?,
        })
    }

    /// Reconstruct a ready-to-predict forecaster from a persisted model,
    /// without retraining. Timezone-dependent features need the original
    /// provider re-attached with `with_timezone_provider`.
    pub fn from_model(model: ForecasterModel) -> Result<Self> {
        let series_model = ForecastModel::from_record(model.series)?;
        let uncertainty_model = ForecastModel::from_record(model.uncertainty)?;

        let options = ForecastOptions {
            series: series_model.options().clone(),
            outlier: model.outlier,
            uncertainty: UncertaintyOptions {
                z_score: model.z_score,
                window: model.residual_window,
                model: uncertainty_model.options().clone(),
            },
        };

        Ok(Self {
            options,
            timezones: Arc::new(UtcOnly),
            series_model: Some(series_model),
            uncertainty_model: Some(uncertainty_model),
            training: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureConfig, GrowthType, SeasonalityConfig};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn make_timestamps(n: usize, step: Duration) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + step * i as i32).collect()
    }

    fn sine_options() -> ForecastOptions {
        ForecastOptions {
            series: ModelOptions::default().with_features(
                FeatureConfig::default()
                    .with_growth(GrowthType::Flat)
                    .with_seasonalities(vec![SeasonalityConfig::daily(2)]),
            ),
            ..Default::default()
        }
    }

    fn daily_sine(timestamps: &[DateTime<Utc>]) -> Vec<f64> {
        timestamps
            .iter()
            .map(|t| {
                let phase = 2.0 * std::f64::consts::PI / 86_400.0
                    * (t.timestamp() as f64).rem_euclid(86_400.0);
                10.0 + 3.0 * phase.sin()
            })
            .collect()
    }

    #[test]
    fn predict_before_fit_fails() {
        let forecaster = Forecaster::default();
        let timestamps = make_timestamps(5, Duration::hours(1));
        assert!(matches!(
            forecaster.predict(&timestamps),
            Err(ForecastError::FitRequired)
        ));
        assert!(matches!(
            forecaster.model(),
            Err(ForecastError::FitRequired)
        ));
    }

    #[test]
    fn fit_predict_composes_band_and_components() {
        let timestamps = make_timestamps(240, Duration::hours(1));
        let values = daily_sine(&timestamps);

        let mut forecaster = Forecaster::new(sine_options());
        forecaster.fit(&timestamps, &values).unwrap();

        let prediction = forecaster.predict(&timestamps).unwrap();
        assert_eq!(prediction.len(), 240);
        assert!(prediction.has_band());

        for i in 0..prediction.len() {
            assert!(prediction.upper[i] >= prediction.lower[i]);
            assert!(prediction.upper[i] >= prediction.forecast[i]);
            // Components are additive.
            assert_relative_eq!(
                prediction.trend[i] + prediction.seasonality[i] + prediction.event[i],
                prediction.forecast[i],
                epsilon = 1e-9
            );
        }

        // Training predictions were cached at fit time.
        let cached = forecaster.training_predictions().unwrap();
        assert_eq!(cached.len(), 240);

        let scores = forecaster.scores().unwrap();
        assert!(scores.r2 > 0.999, "r2 = {}", scores.r2);
    }

    #[test]
    fn fit_never_mutates_caller_data() {
        let timestamps = make_timestamps(200, Duration::hours(1));
        let mut values = daily_sine(&timestamps);
        values[50] += 500.0; // will be masked internally
        let snapshot = values.clone();

        let mut forecaster = Forecaster::new(sine_options());
        forecaster.fit(&timestamps, &values).unwrap();

        assert_eq!(values, snapshot);
    }

    #[test]
    fn model_round_trip_reproduces_predictions() {
        let timestamps = make_timestamps(240, Duration::hours(1));
        let values = daily_sine(&timestamps);

        let mut forecaster = Forecaster::new(sine_options());
        forecaster.fit(&timestamps, &values).unwrap();
        let original = forecaster.predict(&timestamps).unwrap();

        let json = forecaster.model().unwrap().to_json().unwrap();
        let restored = Forecaster::from_model(ForecasterModel::from_json(&json).unwrap()).unwrap();
        let reproduced = restored.predict(&timestamps).unwrap();

        for i in 0..original.len() {
            assert_relative_eq!(original.forecast[i], reproduced.forecast[i], epsilon = 1e-9);
            assert_relative_eq!(original.upper[i], reproduced.upper[i], epsilon = 1e-9);
            assert_relative_eq!(original.lower[i], reproduced.lower[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn missing_values_are_tolerated() {
        let timestamps = make_timestamps(240, Duration::hours(1));
        let mut values = daily_sine(&timestamps);
        for i in (0..240).step_by(11) {
            values[i] = f64::NAN;
        }

        let mut forecaster = Forecaster::new(sine_options());
        forecaster.fit(&timestamps, &values).unwrap();
        assert!(forecaster.is_fitted());
        assert!(forecaster.scores().unwrap().r2 > 0.99);
    }

    #[test]
    fn mismatched_input_lengths_fail_fast() {
        let timestamps = make_timestamps(10, Duration::hours(1));
        let values = vec![1.0; 9];
        let mut forecaster = Forecaster::default();
        assert!(matches!(
            forecaster.fit(&timestamps, &values),
            Err(ForecastError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn equation_and_coefficients_available_after_fit() {
        let timestamps = make_timestamps(200, Duration::hours(1));
        let values = daily_sine(&timestamps);

        let mut forecaster = Forecaster::new(sine_options());
        forecaster.fit(&timestamps, &values).unwrap();

        assert!(!forecaster.coefficients().unwrap().is_empty());
        assert!(forecaster.equation().unwrap().starts_with("y ~"));
    }
}
