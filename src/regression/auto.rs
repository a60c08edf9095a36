//! Automatic regularization selection: parallel search over candidate λ.

use crate::error::{ForecastError, Result};
use crate::metrics::Scores;
use crate::regression::lasso::{lasso_fit, LassoOptions};
use rayon::prelude::*;
use tracing::debug;

/// Options for the candidate-λ search.
#[derive(Debug, Clone)]
pub struct LassoAutoOptions {
    /// Candidate penalty strengths; must be non-empty.
    pub lambdas: Vec<f64>,
    /// Maximum coordinate passes per candidate fit.
    pub max_iterations: usize,
    /// Convergence threshold per candidate fit.
    pub tolerance: f64,
    /// Upper bound on simultaneously running candidate fits.
    pub parallelism: usize,
}

impl Default for LassoAutoOptions {
    fn default() -> Self {
        Self {
            lambdas: vec![0.0],
            max_iterations: 1000,
            tolerance: 1e-6,
            parallelism: 4,
        }
    }
}

/// The winning candidate fit.
#[derive(Debug, Clone)]
pub struct ScoredFit {
    pub lambda: f64,
    pub coefficients: Vec<f64>,
    pub scores: Scores,
}

/// Fit one independent Lasso model per candidate λ on a bounded worker pool
/// and keep the best by training R².
///
/// Workers return their own results; the reduction runs on the calling
/// thread in candidate order, so the outcome is deterministic: ties on R²
/// resolve to the smallest λ (the least-regularized acceptable model).
pub fn lasso_auto_fit(
    columns: &[Vec<f64>],
    y: &[f64],
    options: &LassoAutoOptions,
) -> Result<ScoredFit> {
    if options.lambdas.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "candidate lambda set must not be empty".to_string(),
        ));
    }
    if options.parallelism == 0 {
        return Err(ForecastError::InvalidParameter(
            "parallelism must be at least 1".to_string(),
        ));
    }
    for &lambda in &options.lambdas {
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "lambda must be finite and non-negative, got {lambda}"
            )));
        }
    }

    let workers = options.parallelism.min(options.lambdas.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| ForecastError::ComputationError(format!("worker pool: {e}")))?;

    let candidates: Vec<ScoredFit> = pool.install(|| {
        options
            .lambdas
            .par_iter()
            .map(|&lambda| {
                let coefficients = lasso_fit(
                    columns,
                    y,
                    &LassoOptions {
                        lambda,
                        max_iterations: options.max_iterations,
                        tolerance: options.tolerance,
                        warm_start: None,
                    },
                )?;
                let predicted = predict(columns, &coefficients, y.len());
                let scores = Scores::compute(y, &predicted)?;
                Ok(ScoredFit {
                    lambda,
                    coefficients,
                    scores,
                })
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let mut best: Option<ScoredFit> = None;
    for candidate in candidates {
        let replace = match &best {
            None => true,
            Some(current) => {
                candidate.scores.r2 > current.scores.r2
                    || (candidate.scores.r2 == current.scores.r2
                        && candidate.lambda < current.lambda)
            }
        };
        if replace {
            best = Some(candidate);
        }
    }
    let best = best.expect("validated non-empty candidate set");

    debug!(
        lambda = best.lambda,
        r2 = best.scores.r2,
        candidates = options.lambdas.len(),
        "selected regularization strength"
    );
    Ok(best)
}

fn predict(columns: &[Vec<f64>], coefficients: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n];
    for (column, &coefficient) in columns.iter().zip(coefficients.iter()) {
        if coefficient != 0.0 {
            for (o, &x) in out.iter_mut().zip(column.iter()) {
                *o += coefficient * x;
            }
        }
    }
    out
}
