//! A single additive series model: feature generation plus sparse regression.

use crate::calendar::TimezoneProvider;
use crate::core::{Prediction, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::features::{ChangepointComponent, Feature, FeatureGenerator, FeatureKind};
use crate::metrics::Scores;
use crate::model::{ModelOptions, ModelRecord, WeightRecord};
use crate::regression::{lasso_auto_fit, LassoAutoOptions};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Fitted state, absent until `fit` succeeds.
#[derive(Debug, Clone)]
struct Trained {
    train_start: DateTime<Utc>,
    train_end: DateTime<Utc>,
    weights: BTreeMap<Feature, f64>,
    scores: Option<Scores>,
    /// In-sample predictions in the output domain, over observed rows.
    fitted: Vec<f64>,
    /// Residuals in the fitting domain, over observed rows.
    residuals: Vec<f64>,
}

/// A prediction in the fitting domain, before the inverse transform.
#[derive(Debug, Clone)]
pub(crate) struct RawPrediction {
    pub forecast: Vec<f64>,
    pub trend: Vec<f64>,
    pub seasonality: Vec<f64>,
    pub event: Vec<f64>,
}

/// Combines the feature generator and regression engines for one series.
#[derive(Debug, Clone)]
pub struct ForecastModel {
    options: ModelOptions,
    trained: Option<Trained>,
}

impl ForecastModel {
    pub fn new(options: ModelOptions) -> Self {
        Self {
            options,
            trained: None,
        }
    }

    /// The model's configuration. After a fit this reflects the materialized
    /// changepoints and any pruning, so regenerated feature sets stay
    /// consistent with the learned weights.
    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn is_fitted(&self) -> bool {
        self.trained.is_some()
    }

    pub fn scores(&self) -> Option<Scores> {
        self.trained.as_ref().and_then(|t| t.scores)
    }

    /// In-sample predictions over the observed training rows.
    pub fn fitted_values(&self) -> Option<&[f64]> {
        self.trained.as_ref().map(|t| t.fitted.as_slice())
    }

    /// Fitting-domain residuals over the observed training rows.
    pub fn residuals(&self) -> Option<&[f64]> {
        self.trained.as_ref().map(|t| t.residuals.as_slice())
    }

    pub fn train_start_time(&self) -> Option<DateTime<Utc>> {
        self.trained.as_ref().map(|t| t.train_start)
    }

    pub fn train_end_time(&self) -> Option<DateTime<Utc>> {
        self.trained.as_ref().map(|t| t.train_end)
    }

    /// Fit the model on a series, dropping missing rows first.
    pub fn fit(&mut self, series: &TimeSeries, timezones: &dyn TimezoneProvider) -> Result<()> {
        let (obs_times, obs_values) = series.observed();

        // Transform the target, dropping rows the transform cannot represent.
        let mut times = Vec::with_capacity(obs_times.len());
        let mut target = Vec::with_capacity(obs_times.len());
        let mut actual = Vec::with_capacity(obs_times.len());
        for (t, &v) in obs_times.iter().zip(obs_values.iter()) {
            let transformed = self.options.transform.apply(v);
            if transformed.is_finite() {
                times.push(*t);
                target.push(transformed);
                actual.push(v);
            }
        }
        if times.len() < 2 {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: times.len(),
            });
        }

        let train_start = times[0];
        let train_end = *times.last().expect("validated non-empty");

        // Materialize changepoints up front so the same set survives
        // serialization and post-fit pruning.
        let changepoints = FeatureGenerator::new(&self.options.features, timezones)
            .effective_changepoints(train_start, train_end);
        self.options.features.changepoints = changepoints;
        self.options.features.auto_changepoints = 0;

        let matrix = FeatureGenerator::new(&self.options.features, timezones).generate(
            &times,
            train_start,
            train_end,
        )?;
        let (features, columns) = matrix.to_design();
        if features.is_empty() {
            return Err(ForecastError::ComputationError(
                "no usable features after degenerate-column removal".to_string(),
            ));
        }

        let fit = lasso_auto_fit(
            &columns,
            &target,
            &LassoAutoOptions {
                lambdas: self.options.regularization.clone(),
                max_iterations: self.options.max_iterations,
                tolerance: self.options.tolerance,
                parallelism: self.options.parallelism,
            },
        )?;

        // Zero-valued coefficients carry no signal; growth terms are kept so
        // the trend basis stays intact across refits.
        let mut weights = BTreeMap::new();
        let mut pruned = 0usize;
        for (feature, &coefficient) in features.iter().zip(fit.coefficients.iter()) {
            if coefficient != 0.0 || feature.kind() == FeatureKind::Growth {
                weights.insert(feature.clone(), coefficient);
            } else {
                pruned += 1;
            }
        }

        // Changepoints whose bias and slope were both pruned no longer shape
        // the trend; drop them so regenerated feature sets shrink to match.
        self.options.features.changepoints.retain(|changepoint| {
            [ChangepointComponent::Bias, ChangepointComponent::Slope]
                .iter()
                .any(|&component| {
                    weights.contains_key(&Feature::Changepoint {
                        name: changepoint.name.clone(),
                        component,
                    })
                })
        });

        debug!(
            lambda = fit.lambda,
            features = features.len(),
            pruned,
            "fitted series model"
        );

        self.trained = Some(Trained {
            train_start,
            train_end,
            weights,
            scores: None,
            fitted: Vec::new(),
            residuals: Vec::new(),
        });

        // Recompute fitted values and residuals with the pruned model.
        let raw = self.predict_raw(&times, timezones)?;
        let fitted: Vec<f64> = raw
            .forecast
            .iter()
            .map(|&v| self.options.transform.invert(v))
            .collect();
        let residuals: Vec<f64> = target
            .iter()
            .zip(raw.forecast.iter())
            .map(|(y, p)| y - p)
            .collect();
        let scores = Scores::compute(&actual, &fitted)?;

        let trained = self.trained.as_mut().expect("set above");
        trained.scores = Some(scores);
        trained.fitted = fitted;
        trained.residuals = residuals;
        Ok(())
    }

    /// Predict in the fitting domain, with the additive component breakdown.
    ///
    /// Timestamps may be unsorted and outside the training span. Feature
    /// columns without a learned weight are discarded; learned weights whose
    /// column degenerates over this time range contribute nothing.
    pub(crate) fn predict_raw(
        &self,
        timestamps: &[DateTime<Utc>],
        timezones: &dyn TimezoneProvider,
    ) -> Result<RawPrediction> {
        let trained = self.trained.as_ref().ok_or(ForecastError::FitRequired)?;
        if timestamps.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        let matrix = FeatureGenerator::new(&self.options.features, timezones).generate(
            timestamps,
            trained.train_start,
            trained.train_end,
        )?;

        let n = timestamps.len();
        let mut trend = vec![0.0; n];
        let mut seasonality = vec![0.0; n];
        let mut event = vec![0.0; n];

        for (feature, &weight) in &trained.weights {
            let Some(column) = matrix.column(feature) else {
                continue;
            };
            let component = match feature.kind() {
                FeatureKind::Growth | FeatureKind::Changepoint => &mut trend,
                FeatureKind::Seasonality => &mut seasonality,
                FeatureKind::Event => &mut event,
            };
            for (acc, &x) in component.iter_mut().zip(column.iter()) {
                *acc += weight * x;
            }
        }

        let forecast = (0..n)
            .map(|i| trend[i] + seasonality[i] + event[i])
            .collect();
        Ok(RawPrediction {
            forecast,
            trend,
            seasonality,
            event,
        })
    }

    /// Predict the point forecast and component breakdown for arbitrary
    /// timestamps, inverting the configured transform on the output.
    pub fn predict(
        &self,
        timestamps: &[DateTime<Utc>],
        timezones: &dyn TimezoneProvider,
    ) -> Result<Prediction> {
        let raw = self.predict_raw(timestamps, timezones)?;
        Ok(Prediction {
            timestamps: timestamps.to_vec(),
            forecast: raw
                .forecast
                .iter()
                .map(|&v| self.options.transform.invert(v))
                .collect(),
            upper: Vec::new(),
            lower: Vec::new(),
            trend: raw.trend,
            seasonality: raw.seasonality,
            event: raw.event,
        })
    }

    /// The learned (feature, weight) pairs in canonical order.
    pub fn coefficients(&self) -> Result<Vec<(Feature, f64)>> {
        let trained = self.trained.as_ref().ok_or(ForecastError::FitRequired)?;
        Ok(trained
            .weights
            .iter()
            .map(|(f, &w)| (f.clone(), w))
            .collect())
    }

    /// Human-readable additive model equation.
    pub fn equation(&self) -> Result<String> {
        let trained = self.trained.as_ref().ok_or(ForecastError::FitRequired)?;
        let mut out = String::from("y ~");
        let mut first = true;
        for (feature, &weight) in &trained.weights {
            let term = if feature.is_intercept() {
                format!("{weight:.6}")
            } else {
                format!("{:.6}*{}", weight.abs(), feature)
            };
            if first {
                out.push(' ');
                if !feature.is_intercept() && weight < 0.0 {
                    out.push('-');
                }
                out.push_str(&term);
                first = false;
            } else {
                out.push_str(if !feature.is_intercept() && weight < 0.0 {
                    " - "
                } else {
                    " + "
                });
                out.push_str(&term);
            }
        }
        Ok(out)
    }

    /// Serialize the fitted model into its persistable record.
    pub fn to_record(&self) -> Result<ModelRecord> {
        let trained = self.trained.as_ref().ok_or(ForecastError::FitRequired)?;
        Ok(ModelRecord {
            options: self.options.clone(),
            train_start_time: trained.train_start,
            train_end_time: trained.train_end,
            weights: trained
                .weights
                .iter()
                .map(|(f, &w)| WeightRecord::new(f, w))
                .collect(),
            scores: trained.scores,
        })
    }

    /// Reconstruct a ready-to-predict model from its record, without
    /// retraining.
    pub fn from_record(record: ModelRecord) -> Result<Self> {
        if record.train_end_time < record.train_start_time {
            return Err(ForecastError::ModelRecord(
                "training span is inverted".to_string(),
            ));
        }
        let weights = record.feature_weights()?;
        if weights.is_empty() {
            return Err(ForecastError::ModelRecord(
                "record holds no feature weights".to_string(),
            ));
        }
        for event in &record.options.features.events {
            event.validate()?;
        }

        Ok(Self {
            options: record.options,
            trained: Some(Trained {
                train_start: record.train_start_time,
                train_end: record.train_end_time,
                weights,
                scores: record.scores,
                fitted: Vec::new(),
                residuals: Vec::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::UtcOnly;
    use crate::features::{Changepoint, FeatureConfig, GrowthType, SeasonalityConfig};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn make_timestamps(n: usize, step: Duration) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + step * i as i32).collect()
    }

    fn trend_options() -> ModelOptions {
        ModelOptions::default().with_features(
            FeatureConfig::default()
                .with_growth(GrowthType::Linear)
                .with_seasonalities(vec![]),
        )
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = ForecastModel::new(ModelOptions::default());
        let timestamps = make_timestamps(3, Duration::hours(1));
        assert!(matches!(
            model.predict(&timestamps, &UtcOnly),
            Err(ForecastError::FitRequired)
        ));
    }

    #[test]
    fn fit_requires_two_usable_points() {
        let timestamps = make_timestamps(3, Duration::hours(1));
        let series =
            TimeSeries::new(timestamps, vec![1.0, f64::NAN, f64::NAN]).unwrap();
        let mut model = ForecastModel::new(trend_options());
        assert!(matches!(
            model.fit(&series, &UtcOnly),
            Err(ForecastError::InsufficientData { needed: 2, got: 1 })
        ));
    }

    #[test]
    fn fits_linear_trend() {
        let timestamps = make_timestamps(50, Duration::hours(1));
        let values: Vec<f64> = (0..50).map(|i| 10.0 + 2.0 * i as f64).collect();
        let series = TimeSeries::new(timestamps.clone(), values.clone()).unwrap();

        let mut model = ForecastModel::new(trend_options());
        model.fit(&series, &UtcOnly).unwrap();

        let prediction = model.predict(&timestamps, &UtcOnly).unwrap();
        for (p, v) in prediction.forecast.iter().zip(values.iter()) {
            assert_relative_eq!(p, v, epsilon = 1e-4);
        }

        let scores = model.scores().unwrap();
        assert!(scores.r2 > 0.9999);
        assert!(scores.mse < 1e-6);
    }

    #[test]
    fn constant_series_has_perfect_scores() {
        let timestamps = make_timestamps(48, Duration::hours(1));
        let series = TimeSeries::new(timestamps, vec![5.5; 48]).unwrap();

        let mut model = ForecastModel::new(trend_options());
        model.fit(&series, &UtcOnly).unwrap();

        let scores = model.scores().unwrap();
        assert_relative_eq!(scores.r2, 1.0, epsilon = 1e-9);
        assert!(scores.mse < 1e-9);
        assert!(scores.mape < 1e-6);

        for (feature, weight) in model.coefficients().unwrap() {
            if !feature.is_intercept() {
                assert!(weight.abs() < 1e-6, "{feature} = {weight}");
            }
        }
    }

    #[test]
    fn missing_rows_are_dropped_before_fit() {
        let timestamps = make_timestamps(40, Duration::hours(1));
        let mut values: Vec<f64> = (0..40).map(|i| 1.0 + 0.5 * i as f64).collect();
        values[3] = f64::NAN;
        values[17] = f64::NAN;
        let series = TimeSeries::new(timestamps.clone(), values).unwrap();

        let mut model = ForecastModel::new(trend_options());
        model.fit(&series, &UtcOnly).unwrap();

        assert_eq!(model.fitted_values().unwrap().len(), 38);
        assert_eq!(model.residuals().unwrap().len(), 38);
    }

    #[test]
    fn level_shift_needs_changepoint() {
        let timestamps = make_timestamps(100, Duration::hours(1));
        let shift_at = timestamps[60];
        let values: Vec<f64> = timestamps
            .iter()
            .map(|t| if *t >= shift_at { 20.0 } else { 10.0 })
            .collect();
        let series = TimeSeries::new(timestamps.clone(), values.clone()).unwrap();

        // Without the changepoint the residual stays large and structured.
        let mut plain = ForecastModel::new(
            ModelOptions::default().with_features(
                FeatureConfig::default()
                    .with_growth(GrowthType::Flat)
                    .with_seasonalities(vec![]),
            ),
        );
        plain.fit(&series, &UtcOnly).unwrap();
        let plain_mse = plain.scores().unwrap().mse;
        assert!(plain_mse > 1.0);

        let mut with_changepoint = ForecastModel::new(
            ModelOptions::default().with_features(
                FeatureConfig::default()
                    .with_growth(GrowthType::Flat)
                    .with_seasonalities(vec![])
                    .with_changepoints(vec![Changepoint::new("shift", shift_at)]),
            ),
        );
        with_changepoint.fit(&series, &UtcOnly).unwrap();
        let shifted_mse = with_changepoint.scores().unwrap().mse;
        assert!(shifted_mse < 1e-6, "mse = {shifted_mse}");
    }

    #[test]
    fn pruning_drops_unused_changepoints() {
        let timestamps = make_timestamps(60, Duration::hours(1));
        // A constant series: the trailing changepoint explains nothing, its
        // bias weight soft-thresholds to exactly zero, and its slope column
        // is degenerate, so the changepoint vanishes from the retained
        // configuration.
        let series = TimeSeries::new(timestamps.clone(), vec![7.0; 60]).unwrap();

        let mut model = ForecastModel::new(
            ModelOptions::default()
                .with_features(
                    FeatureConfig::default()
                        .with_growth(GrowthType::Flat)
                        .with_seasonalities(vec![])
                        .with_changepoints(vec![Changepoint::new("tail", timestamps[59])]),
                )
                .with_regularization(vec![1.0]),
        );
        model.fit(&series, &UtcOnly).unwrap();

        assert!(model.options().features.changepoints.is_empty());
        for (feature, _) in model.coefficients().unwrap() {
            assert!(
                !matches!(feature, Feature::Changepoint { .. }),
                "weight survived for dropped changepoint"
            );
        }
    }

    #[test]
    fn explaining_changepoint_survives_pruning() {
        let timestamps = make_timestamps(100, Duration::hours(1));
        let values: Vec<f64> = timestamps
            .iter()
            .map(|t| if *t >= timestamps[60] { 20.0 } else { 10.0 })
            .collect();
        let series = TimeSeries::new(timestamps.clone(), values).unwrap();

        let mut model = ForecastModel::new(
            ModelOptions::default()
                .with_features(
                    FeatureConfig::default()
                        .with_growth(GrowthType::Flat)
                        .with_seasonalities(vec![])
                        .with_changepoints(vec![Changepoint::new("shift", timestamps[60])]),
                )
                .with_regularization(vec![1.0]),
        );
        model.fit(&series, &UtcOnly).unwrap();

        assert_eq!(model.options().features.changepoints.len(), 1);
        let weights = model.coefficients().unwrap();
        let bias = weights
            .iter()
            .find(|(f, _)| {
                matches!(
                    f,
                    Feature::Changepoint {
                        component: ChangepointComponent::Bias,
                        ..
                    }
                )
            })
            .expect("bias weight kept");
        assert!(bias.1 > 5.0);
    }

    #[test]
    fn auto_changepoints_are_materialized() {
        let timestamps = make_timestamps(60, Duration::hours(1));
        let values: Vec<f64> = (0..60).map(|i| (i as f64 * 0.3).sin()).collect();
        let series = TimeSeries::new(timestamps, values).unwrap();

        let mut model = ForecastModel::new(
            ModelOptions::default().with_features(
                FeatureConfig::default()
                    .with_seasonalities(vec![])
                    .with_auto_changepoints(3),
            ),
        );
        model.fit(&series, &UtcOnly).unwrap();

        assert_eq!(model.options().features.auto_changepoints, 0);
        assert!(model.options().features.changepoints.len() <= 3);
    }

    #[test]
    fn record_round_trip_reproduces_predictions() {
        let timestamps = make_timestamps(72, Duration::hours(1));
        let values: Vec<f64> = timestamps
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let phase =
                    2.0 * std::f64::consts::PI / 86_400.0 * (t.timestamp() as f64).rem_euclid(86_400.0);
                5.0 + 0.01 * i as f64 + 2.0 * phase.sin()
            })
            .collect();
        let series = TimeSeries::new(timestamps.clone(), values).unwrap();

        let mut model = ForecastModel::new(
            ModelOptions::default()
                .with_features(
                    FeatureConfig::default()
                        .with_seasonalities(vec![SeasonalityConfig::daily(2)]),
                ),
        );
        model.fit(&series, &UtcOnly).unwrap();
        let original = model.predict(&timestamps, &UtcOnly).unwrap();

        let json = serde_json::to_string(&model.to_record().unwrap()).unwrap();
        let record: ModelRecord = serde_json::from_str(&json).unwrap();
        let restored = ForecastModel::from_record(record).unwrap();
        let reproduced = restored.predict(&timestamps, &UtcOnly).unwrap();

        for (a, b) in original.forecast.iter().zip(reproduced.forecast.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn record_without_weights_rejected() {
        let record = ModelRecord {
            options: ModelOptions::default(),
            train_start_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            train_end_time: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            weights: vec![],
            scores: None,
        };
        assert!(matches!(
            ForecastModel::from_record(record),
            Err(ForecastError::ModelRecord(_))
        ));
    }

    #[test]
    fn log_transform_round_trips_through_predict() {
        let timestamps = make_timestamps(50, Duration::hours(1));
        let values: Vec<f64> = (0..50).map(|i| (10.0 + 0.5 * i as f64).exp_m1()).collect();
        let series = TimeSeries::new(timestamps.clone(), values.clone()).unwrap();

        let mut model = ForecastModel::new(
            trend_options().with_transform(crate::model::Transform::Log),
        );
        model.fit(&series, &UtcOnly).unwrap();

        let prediction = model.predict(&timestamps, &UtcOnly).unwrap();
        for (p, v) in prediction.forecast.iter().zip(values.iter()) {
            assert_relative_eq!(p / v, 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn equation_mentions_intercept_first() {
        let timestamps = make_timestamps(30, Duration::hours(1));
        let values: Vec<f64> = (0..30).map(|i| 4.0 + 1.0 * i as f64).collect();
        let series = TimeSeries::new(timestamps, values).unwrap();

        let mut model = ForecastModel::new(trend_options());
        model.fit(&series, &UtcOnly).unwrap();

        let equation = model.equation().unwrap();
        assert!(equation.starts_with("y ~ "));
        assert!(equation.contains("growth/linear"));
    }
}
