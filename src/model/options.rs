//! Per-series model configuration.

use crate::features::FeatureConfig;
use serde::{Deserialize, Serialize};

/// Optional transform applied to the target before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Fit in the original domain.
    #[default]
    None,
    /// Fit `ln(1 + y)`; predictions are inverted with `exp(y) - 1`.
    Log,
}

impl Transform {
    /// Forward transform applied to a target value.
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Transform::None => value,
            Transform::Log => value.ln_1p(),
        }
    }

    /// Inverse transform applied to a prediction.
    pub fn invert(&self, value: f64) -> f64 {
        match self {
            Transform::None => value,
            Transform::Log => value.exp_m1(),
        }
    }
}

/// Configuration for one `ForecastModel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Feature-generation configuration.
    pub features: FeatureConfig,
    /// Candidate L1 penalties searched at fit time; a single zero entry
    /// behaves as plain OLS.
    pub regularization: Vec<f64>,
    /// Maximum coordinate passes per candidate fit.
    pub max_iterations: usize,
    /// Convergence threshold per candidate fit.
    pub tolerance: f64,
    /// Upper bound on concurrently fitting candidates.
    pub parallelism: usize,
    /// Target-domain transform.
    pub transform: Transform,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            regularization: vec![0.0],
            max_iterations: 1000,
            tolerance: 1e-6,
            parallelism: 4,
            transform: Transform::None,
        }
    }
}

impl ModelOptions {
    pub fn with_features(mut self, features: FeatureConfig) -> Self {
        self.features = features;
        self
    }

    pub fn with_regularization(mut self, lambdas: Vec<f64>) -> Self {
        self.regularization = lambdas;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }
}
