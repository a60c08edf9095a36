//! Serializable model artifact for train-once/infer-many workflows.

use crate::error::{ForecastError, Result};
use crate::features::{Feature, FeatureKind};
use crate::metrics::Scores;
use crate::model::ModelOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One persisted coefficient: feature kind, stable label map, value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    pub kind: FeatureKind,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl WeightRecord {
    pub fn new(feature: &Feature, value: f64) -> Self {
        Self {
            kind: feature.kind(),
            labels: feature.labels(),
            value,
        }
    }

    /// Rebuild the feature identity this weight belongs to.
    pub fn feature(&self) -> Result<Feature> {
        Feature::from_labels(self.kind, &self.labels)
    }
}

/// The full serializable artifact of one fitted `ForecastModel`.
///
/// Round-trips into a ready-to-predict model without retraining; the design
/// matrix itself is never persisted, only the configuration and weights
/// needed to regenerate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub options: ModelOptions,
    pub train_start_time: DateTime<Utc>,
    pub train_end_time: DateTime<Utc>,
    pub weights: Vec<WeightRecord>,
    pub scores: Option<Scores>,
}

impl ModelRecord {
    /// Parse the persisted weights back into feature/value pairs.
    pub fn feature_weights(&self) -> Result<BTreeMap<Feature, f64>> {
        let mut weights = BTreeMap::new();
        for record in &self.weights {
            let feature = record.feature()?;
            if weights.insert(feature.clone(), record.value).is_some() {
                return Err(ForecastError::ModelRecord(format!(
                    "duplicate weight for feature '{feature}'"
                )));
            }
        }
        Ok(weights)
    }
}
