//! Fit-quality metrics persisted with every trained model.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Summary fit quality, recomputed from predictions vs. training targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// Mean Squared Error.
    pub mse: f64,
    /// Mean Absolute Percentage Error, as a fraction. Zero-valued actuals
    /// are skipped; an all-zero target yields 0.
    pub mape: f64,
    /// R-squared (coefficient of determination). 1.0 for a zero-variance
    /// target matched exactly.
    pub r2: f64,
}

impl Scores {
    /// Compute scores between actual and predicted values.
    ///
    /// Pairs where either side is non-finite are skipped for all three
    /// metrics so partially masked training series score on the points that
    /// were actually fit.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.is_empty() || predicted.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if actual.len() != predicted.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: actual.len(),
                got: predicted.len(),
            });
        }

        let mut n = 0usize;
        let mut sum_sq = 0.0;
        let mut sum_actual = 0.0;
        let mut mape_n = 0usize;
        let mut mape_sum = 0.0;

        for (&a, &p) in actual.iter().zip(predicted.iter()) {
            if !a.is_finite() || !p.is_finite() {
                continue;
            }
            n += 1;
            sum_sq += (a - p) * (a - p);
            sum_actual += a;
            if a != 0.0 {
                mape_n += 1;
                mape_sum += ((a - p) / a).abs();
            }
        }

        if n == 0 {
            return Err(ForecastError::EmptyData);
        }

        let mse = sum_sq / n as f64;
        let mape = if mape_n == 0 {
            0.0
        } else {
            mape_sum / mape_n as f64
        };

        let mean_actual = sum_actual / n as f64;
        let ss_tot: f64 = actual
            .iter()
            .zip(predicted.iter())
            .filter(|(a, p)| a.is_finite() && p.is_finite())
            .map(|(a, _)| (a - mean_actual) * (a - mean_actual))
            .sum();
        let r2 = if ss_tot == 0.0 { 1.0 } else { 1.0 - sum_sq / ss_tot };

        Ok(Scores { mse, mape, r2 })
    }
}
