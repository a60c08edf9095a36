//! Feature identities for design-matrix columns.
//!
//! A `Feature` is a tagged, immutable identity: a kind plus a small label
//! payload. Equality, ordering, and lookup go through the canonical string
//! form, and the label map uses stable keys so serialized weights stay
//! forward compatible.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Growth,
    Changepoint,
    Seasonality,
    Event,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Growth => write!(f, "growth"),
            FeatureKind::Changepoint => write!(f, "changepoint"),
            FeatureKind::Seasonality => write!(f, "seasonality"),
            FeatureKind::Event => write!(f, "event"),
        }
    }
}

/// Growth basis term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthTerm {
    Intercept,
    Linear,
    Quadratic,
}

impl GrowthTerm {
    fn as_str(&self) -> &'static str {
        match self {
            GrowthTerm::Intercept => "intercept",
            GrowthTerm::Linear => "linear",
            GrowthTerm::Quadratic => "quadratic",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "intercept" => Some(GrowthTerm::Intercept),
            "linear" => Some(GrowthTerm::Linear),
            "quadratic" => Some(GrowthTerm::Quadratic),
            _ => None,
        }
    }
}

/// Half of a changepoint's piecewise basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangepointComponent {
    /// Level shift: 1 while this changepoint is the nearest preceding one.
    Bias,
    /// Local slope: seconds since the changepoint, same masking.
    Slope,
}

impl ChangepointComponent {
    fn as_str(&self) -> &'static str {
        match self {
            ChangepointComponent::Bias => "bias",
            ChangepointComponent::Slope => "slope",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "bias" => Some(ChangepointComponent::Bias),
            "slope" => Some(ChangepointComponent::Slope),
            _ => None,
        }
    }
}

/// Half of a Fourier sin/cos pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FourierComponent {
    Sin,
    Cos,
}

impl FourierComponent {
    fn as_str(&self) -> &'static str {
        match self {
            FourierComponent::Sin => "sin",
            FourierComponent::Cos => "cos",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "sin" => Some(FourierComponent::Sin),
            "cos" => Some(FourierComponent::Cos),
            _ => None,
        }
    }
}

/// A design-matrix column identity.
///
/// The derived ordering groups columns by kind (growth, changepoint,
/// seasonality, event) and is the column order used for regression, so fits
/// are reproducible run to run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    Growth(GrowthTerm),
    Changepoint {
        name: String,
        component: ChangepointComponent,
    },
    Seasonality {
        name: String,
        order: usize,
        component: FourierComponent,
    },
    Event {
        name: String,
    },
}

/// Stable label-map keys.
const LABEL_NAME: &str = "name";
const LABEL_CHANGEPOINT_COMPONENT: &str = "changepoint_component";
const LABEL_FOURIER_COMPONENT: &str = "fourier_component";
const LABEL_FOURIER_ORDER: &str = "fourier_order";

impl Feature {
    /// The feature's kind tag.
    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::Growth(_) => FeatureKind::Growth,
            Feature::Changepoint { .. } => FeatureKind::Changepoint,
            Feature::Seasonality { .. } => FeatureKind::Seasonality,
            Feature::Event { .. } => FeatureKind::Event,
        }
    }

    /// The label map persisted with a fitted weight.
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        match self {
            Feature::Growth(term) => {
                labels.insert(LABEL_NAME.to_string(), term.as_str().to_string());
            }
            Feature::Changepoint { name, component } => {
                labels.insert(LABEL_NAME.to_string(), name.clone());
                labels.insert(
                    LABEL_CHANGEPOINT_COMPONENT.to_string(),
                    component.as_str().to_string(),
                );
            }
            Feature::Seasonality {
                name,
                order,
                component,
            } => {
                labels.insert(LABEL_NAME.to_string(), name.clone());
                labels.insert(
                    LABEL_FOURIER_COMPONENT.to_string(),
                    component.as_str().to_string(),
                );
                labels.insert(LABEL_FOURIER_ORDER.to_string(), order.to_string());
            }
            Feature::Event { name } => {
                labels.insert(LABEL_NAME.to_string(), name.clone());
            }
        }
        labels
    }

    /// Rebuild a feature from its persisted (kind, labels) form.
    pub fn from_labels(kind: FeatureKind, labels: &BTreeMap<String, String>) -> Result<Self> {
        let name = labels
            .get(LABEL_NAME)
            .ok_or_else(|| ForecastError::ModelRecord("weight label 'name' missing".to_string()))?;

        match kind {
            FeatureKind::Growth => {
                let term = GrowthTerm::parse(name).ok_or_else(|| {
                    ForecastError::ModelRecord(format!("unknown growth term '{name}'"))
                })?;
                Ok(Feature::Growth(term))
            }
            FeatureKind::Changepoint => {
                let component = labels
                    .get(LABEL_CHANGEPOINT_COMPONENT)
                    .and_then(|s| ChangepointComponent::parse(s))
                    .ok_or_else(|| {
                        ForecastError::ModelRecord(
                            "changepoint weight missing a valid component label".to_string(),
                        )
                    })?;
                Ok(Feature::Changepoint {
                    name: name.clone(),
                    component,
                })
            }
            FeatureKind::Seasonality => {
                let component = labels
                    .get(LABEL_FOURIER_COMPONENT)
                    .and_then(|s| FourierComponent::parse(s))
                    .ok_or_else(|| {
                        ForecastError::ModelRecord(
                            "seasonality weight missing a valid component label".to_string(),
                        )
                    })?;
                let order = labels
                    .get(LABEL_FOURIER_ORDER)
                    .and_then(|s| s.parse::<usize>().ok())
                    .ok_or_else(|| {
                        ForecastError::ModelRecord(
                            "seasonality weight missing a valid order label".to_string(),
                        )
                    })?;
                Ok(Feature::Seasonality {
                    name: name.clone(),
                    order,
                    component,
                })
            }
            FeatureKind::Event => Ok(Feature::Event { name: name.clone() }),
        }
    }

    /// Whether this is the intercept column.
    pub fn is_intercept(&self) -> bool {
        matches!(self, Feature::Growth(GrowthTerm::Intercept))
    }
}

impl fmt::Display for Feature {
    /// Canonical string form used for equality, lookup, and diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Growth(term) => write!(f, "growth/{}", term.as_str()),
            Feature::Changepoint { name, component } => {
                write!(f, "changepoint/{}/{}", name, component.as_str())
            }
            Feature::Seasonality {
                name,
                order,
                component,
            } => write!(f, "seasonality/{}/{}/{}", name, component.as_str(), order),
            Feature::Event { name } => write!(f, "event/{}", name),
        }
    }
}
