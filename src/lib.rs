//! # tidecast
//!
//! Additive time series forecasting with sparse linear regression.
//!
//! A target series is decomposed into growth/changepoint trend, Fourier
//! seasonality, and event/holiday/weekend effects, estimated by
//! L1-regularized regression with automatic selection of the penalty
//! strength. Fitting is outlier-robust (iterative Tukey masking) and a
//! secondary model forecasts a time-varying uncertainty band. Fitted models
//! serialize into a compact record for train-once/infer-many deployments.
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use tidecast::prelude::*;
//!
//! let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let timestamps: Vec<_> = (0..240).map(|i| base + Duration::hours(i)).collect();
//! let values: Vec<f64> = timestamps
//!     .iter()
//!     .map(|t| {
//!         let day = (t.timestamp() as f64).rem_euclid(86_400.0) / 86_400.0;
//!         10.0 + 2.0 * (2.0 * std::f64::consts::PI * day).sin()
//!     })
//!     .collect();
//!
//! let mut forecaster = Forecaster::default();
//! forecaster.fit(&timestamps, &values).unwrap();
//! let prediction = forecaster.predict(&timestamps).unwrap();
//! assert_eq!(prediction.forecast.len(), 240);
//! ```

pub mod calendar;
pub mod core;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod metrics;
pub mod model;
pub mod outlier;
pub mod regression;
pub mod uncertainty;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{Prediction, TimeSeries};
    pub use crate::error::{ForecastError, Result};
    pub use crate::features::{Event, FeatureConfig, SeasonalityConfig};
    pub use crate::forecaster::{ForecastOptions, Forecaster, ForecasterModel};
    pub use crate::metrics::Scores;
    pub use crate::model::{ForecastModel, ModelOptions};
}
