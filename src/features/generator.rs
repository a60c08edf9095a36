//! Feature generation: timestamps + configuration → design matrix.

use crate::calendar::TimezoneProvider;
use crate::error::{ForecastError, Result};
use crate::features::{
    Changepoint, ChangepointComponent, Event, Feature, FeatureConfig, FeatureMatrix,
    FourierComponent, GrowthTerm, GrowthType,
};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use std::collections::BTreeMap;
use std::f64::consts::PI;

const SECONDS_PER_DAY: i64 = 86_400;
/// Seconds into a Monday-anchored week at which Saturday begins.
const SATURDAY_START: i64 = 5 * SECONDS_PER_DAY;

/// Pure function from timestamps to named feature columns.
///
/// The generator is stateless; training boundaries are passed in so the same
/// configuration regenerates identical columns at fit and predict time.
pub struct FeatureGenerator<'a> {
    config: &'a FeatureConfig,
    timezones: &'a dyn TimezoneProvider,
}

impl<'a> FeatureGenerator<'a> {
    pub fn new(config: &'a FeatureConfig, timezones: &'a dyn TimezoneProvider) -> Self {
        Self { config, timezones }
    }

    /// Generate the full feature matrix for the given timestamps.
    ///
    /// `train_start`/`train_end` clip changepoints, anchor the growth basis,
    /// and gate seasonality blocks; they stay fixed at prediction time.
    /// Degenerate (all-zero or constant) columns are dropped.
    pub fn generate(
        &self,
        timestamps: &[DateTime<Utc>],
        train_start: DateTime<Utc>,
        train_end: DateTime<Utc>,
    ) -> Result<FeatureMatrix> {
        if timestamps.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        let mut matrix = FeatureMatrix::new(timestamps.len());
        self.growth_columns(&mut matrix, timestamps, train_start)?;
        self.changepoint_columns(&mut matrix, timestamps, train_start, train_end)?;
        self.seasonality_columns(&mut matrix, timestamps, train_start, train_end)?;
        self.event_columns(&mut matrix, timestamps)?;
        self.weekend_column(&mut matrix, timestamps)?;
        matrix.drop_degenerate();
        Ok(matrix)
    }

    /// The changepoints the trend basis will actually use: explicit ones
    /// sorted and clipped to the training span, or auto-placed ones spread
    /// evenly across it.
    pub fn effective_changepoints(
        &self,
        train_start: DateTime<Utc>,
        train_end: DateTime<Utc>,
    ) -> Vec<Changepoint> {
        if !self.config.changepoints.is_empty() {
            let mut changepoints: Vec<Changepoint> = self
                .config
                .changepoints
                .iter()
                .filter(|c| c.at >= train_start && c.at <= train_end)
                .cloned()
                .collect();
            changepoints.sort_by_key(|c| c.at);
            return changepoints;
        }

        let count = self.config.auto_changepoints;
        if count == 0 {
            return Vec::new();
        }
        let span = (train_end - train_start).num_seconds();
        (0..count)
            .map(|i| {
                let offset = span * (i as i64 + 1) / (count as i64 + 1);
                Changepoint::new(
                    &format!("auto_{i}"),
                    train_start + Duration::seconds(offset),
                )
            })
            .collect()
    }

    fn growth_columns(
        &self,
        matrix: &mut FeatureMatrix,
        timestamps: &[DateTime<Utc>],
        train_start: DateTime<Utc>,
    ) -> Result<()> {
        matrix.insert(
            Feature::Growth(GrowthTerm::Intercept),
            vec![1.0; timestamps.len()],
        )?;

        if matches!(self.config.growth, GrowthType::Linear | GrowthType::Quadratic) {
            let linear: Vec<f64> = timestamps
                .iter()
                .map(|t| (*t - train_start).num_seconds() as f64)
                .collect();
            if matches!(self.config.growth, GrowthType::Quadratic) {
                matrix.insert(
                    Feature::Growth(GrowthTerm::Quadratic),
                    linear.iter().map(|x| x * x).collect(),
                )?;
            }
            matrix.insert(Feature::Growth(GrowthTerm::Linear), linear)?;
        }
        Ok(())
    }

    fn changepoint_columns(
        &self,
        matrix: &mut FeatureMatrix,
        timestamps: &[DateTime<Utc>],
        train_start: DateTime<Utc>,
        train_end: DateTime<Utc>,
    ) -> Result<()> {
        let changepoints = self.effective_changepoints(train_start, train_end);
        if changepoints.is_empty() {
            return Ok(());
        }

        let n = timestamps.len();
        let mut bias = vec![vec![0.0; n]; changepoints.len()];
        let mut slope = vec![vec![0.0; n]; changepoints.len()];

        for (row, t) in timestamps.iter().enumerate() {
            // Index of the nearest preceding changepoint, if any.
            let segment = changepoints.partition_point(|c| c.at <= *t);
            if segment == 0 {
                continue;
            }
            let idx = segment - 1;
            bias[idx][row] = 1.0;
            slope[idx][row] = (*t - changepoints[idx].at).num_seconds() as f64;
        }

        for (i, changepoint) in changepoints.iter().enumerate() {
            matrix.insert(
                Feature::Changepoint {
                    name: changepoint.name.clone(),
                    component: ChangepointComponent::Bias,
                },
                std::mem::take(&mut bias[i]),
            )?;
            matrix.insert(
                Feature::Changepoint {
                    name: changepoint.name.clone(),
                    component: ChangepointComponent::Slope,
                },
                std::mem::take(&mut slope[i]),
            )?;
        }
        Ok(())
    }

    fn seasonality_columns(
        &self,
        matrix: &mut FeatureMatrix,
        timestamps: &[DateTime<Utc>],
        train_start: DateTime<Utc>,
        train_end: DateTime<Utc>,
    ) -> Result<()> {
        if self.config.seasonalities.is_empty() {
            return Ok(());
        }

        let adjusted = self.adjusted_seconds(timestamps)?;
        let train_span = (train_end - train_start).num_seconds() as f64;

        for seasonality in &self.config.seasonalities {
            if seasonality.period_secs <= 0.0 || seasonality.fourier_order == 0 {
                return Err(ForecastError::InvalidParameter(format!(
                    "seasonality '{}' needs a positive period and order",
                    seasonality.name
                )));
            }
            // A block whose period exceeds the observed span cannot complete
            // a cycle and only destabilizes the fit.
            if train_span < seasonality.period_secs {
                continue;
            }

            for k in 1..=seasonality.fourier_order {
                let omega = 2.0 * PI * k as f64 / seasonality.period_secs;
                let phases: Vec<f64> = adjusted
                    .iter()
                    .map(|t| omega * t.rem_euclid(seasonality.period_secs))
                    .collect();
                matrix.insert(
                    Feature::Seasonality {
                        name: seasonality.name.clone(),
                        order: k,
                        component: FourierComponent::Sin,
                    },
                    phases.iter().map(|p| p.sin()).collect(),
                )?;
                matrix.insert(
                    Feature::Seasonality {
                        name: seasonality.name.clone(),
                        order: k,
                        component: FourierComponent::Cos,
                    },
                    phases.iter().map(|p| p.cos()).collect(),
                )?;
            }
        }
        Ok(())
    }

    /// Unix seconds per timestamp, shifted by the mean DST offset of the
    /// configured zones so periodic phase stays stable across transitions.
    fn adjusted_seconds(&self, timestamps: &[DateTime<Utc>]) -> Result<Vec<f64>> {
        let dst = &self.config.dst;
        if !dst.enabled || dst.timezones.is_empty() {
            return Ok(timestamps.iter().map(|t| t.timestamp() as f64).collect());
        }

        let mut adjusted = Vec::with_capacity(timestamps.len());
        for t in timestamps {
            let mut total = 0.0;
            for zone in &dst.timezones {
                total += self.timezones.dst_offset(zone, *t)?.num_seconds() as f64;
            }
            adjusted.push(t.timestamp() as f64 + total / dst.timezones.len() as f64);
        }
        Ok(adjusted)
    }

    fn event_columns(
        &self,
        matrix: &mut FeatureMatrix,
        timestamps: &[DateTime<Utc>],
    ) -> Result<()> {
        if self.config.events.is_empty() {
            return Ok(());
        }

        let options = &self.config.event_options;
        let before = Duration::seconds(options.before_secs);
        let after = Duration::seconds(options.after_secs);

        // Same-named events share one column with one learned coefficient.
        let mut grouped: BTreeMap<&str, Vec<&Event>> = BTreeMap::new();
        for event in &self.config.events {
            event.validate()?;
            grouped.entry(event.name()).or_default().push(event);
        }

        for (name, events) in grouped {
            let mut column = vec![0.0_f64; timestamps.len()];
            for event in events {
                let start = event.start() - before;
                let end = event.end() + after;
                let width = (end - start).num_seconds() as f64;
                if width <= 0.0 {
                    continue;
                }
                for (row, t) in timestamps.iter().enumerate() {
                    let u = (*t - start).num_seconds() as f64 / width;
                    column[row] = column[row].max(options.window.evaluate(u));
                }
            }
            matrix.insert(
                Feature::Event {
                    name: name.to_string(),
                },
                column,
            )?;
        }
        Ok(())
    }

    fn weekend_column(
        &self,
        matrix: &mut FeatureMatrix,
        timestamps: &[DateTime<Utc>],
    ) -> Result<()> {
        let weekend = &self.config.weekend;
        if !weekend.enabled {
            return Ok(());
        }

        let before = weekend.before_secs.clamp(0, SECONDS_PER_DAY);
        let after = weekend.after_secs.clamp(0, SECONDS_PER_DAY);
        let zone = weekend.timezone.as_deref().unwrap_or("UTC");

        let mut column = vec![0.0; timestamps.len()];
        for (row, t) in timestamps.iter().enumerate() {
            let local = *t + self.timezones.utc_offset(zone, *t)?;
            let seconds_of_week = local.weekday().num_days_from_monday() as i64
                * SECONDS_PER_DAY
                + local.num_seconds_from_midnight() as i64;
            if seconds_of_week >= SATURDAY_START - before || seconds_of_week < after {
                column[row] = 1.0;
            }
        }
        matrix.insert(
            Feature::Event {
                name: "weekend".to_string(),
            },
            column,
        )?;
        Ok(())
    }
}
