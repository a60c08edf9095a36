//! L1-regularized regression via cyclic coordinate descent.

use crate::error::{ForecastError, Result};

/// Options for a single Lasso fit.
#[derive(Debug, Clone)]
pub struct LassoOptions {
    /// L1 penalty strength. Zero reduces to the OLS solution.
    pub lambda: f64,
    /// Maximum number of full coordinate passes.
    pub max_iterations: usize,
    /// Convergence threshold, relative to the largest coefficient magnitude
    /// seen in a pass.
    pub tolerance: f64,
    /// Initial coefficients; must match the column count when supplied.
    pub warm_start: Option<Vec<f64>>,
}

impl Default for LassoOptions {
    fn default() -> Self {
        Self {
            lambda: 1.0,
            max_iterations: 1000,
            tolerance: 1e-6,
            warm_start: None,
        }
    }
}

impl LassoOptions {
    /// Validate against a design with `num_features` columns.
    pub fn validate(&self, num_features: usize) -> Result<()> {
        if !self.lambda.is_finite() || self.lambda < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "lambda must be finite and non-negative, got {}",
                self.lambda
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if let Some(warm) = &self.warm_start {
            if warm.len() != num_features {
                return Err(ForecastError::DimensionMismatch {
                    expected: num_features,
                    got: warm.len(),
                });
            }
        }
        Ok(())
    }
}

/// The proximal operator for an L1 penalty.
///
/// Returns 0 when `|x| <= gamma`, otherwise shrinks the magnitude by
/// `gamma` while preserving the sign.
pub fn soft_threshold(x: f64, gamma: f64) -> f64 {
    x.signum() * (x.abs() - gamma).max(0.0)
}

/// Fit `y ≈ X·β` with an L1 penalty by cyclic coordinate descent.
///
/// `columns` is the design matrix in column-major order. Each pass updates
/// every coefficient against its partial residual, maintained incrementally
/// through a running `X·β` accumulator. Iteration stops when the largest
/// coefficient change in a pass falls below `tolerance` times the largest
/// coefficient magnitude in that pass, or at `max_iterations`.
pub fn lasso_fit(columns: &[Vec<f64>], y: &[f64], options: &LassoOptions) -> Result<Vec<f64>> {
    let n = y.len();
    if n == 0 {
        return Err(ForecastError::EmptyData);
    }
    if columns.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "no feature columns to fit".to_string(),
        ));
    }
    for column in columns {
        if column.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: column.len(),
            });
        }
    }
    options.validate(columns.len())?;

    let p = columns.len();
    let norms: Vec<f64> = columns
        .iter()
        .map(|c| c.iter().map(|v| v * v).sum())
        .collect();

    let mut beta = match &options.warm_start {
        Some(warm) => warm.clone(),
        None => vec![0.0; p],
    };

    // Running X·β, updated in place as coefficients move.
    let mut fitted = vec![0.0; n];
    for (j, column) in columns.iter().enumerate() {
        if beta[j] != 0.0 {
            for (f, &x) in fitted.iter_mut().zip(column.iter()) {
                *f += beta[j] * x;
            }
        }
    }

    for _ in 0..options.max_iterations {
        let mut max_delta = 0.0_f64;
        let mut max_beta = 0.0_f64;

        for j in 0..p {
            if norms[j] == 0.0 {
                continue;
            }
            let column = &columns[j];

            // Project the partial residual onto column j.
            let mut rho = 0.0;
            for i in 0..n {
                rho += column[i] * (y[i] - fitted[i]);
            }
            let z = beta[j] + rho / norms[j];
            let updated = soft_threshold(z, options.lambda / norms[j]);

            let delta = updated - beta[j];
            if delta != 0.0 {
                for (f, &x) in fitted.iter_mut().zip(column.iter()) {
                    *f += delta * x;
                }
                beta[j] = updated;
            }
            max_delta = max_delta.max(delta.abs());
            max_beta = max_beta.max(updated.abs());
        }

        if max_delta <= options.tolerance * max_beta {
            break;
        }
    }

    Ok(beta)
}
