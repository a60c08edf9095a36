//! Per-series forecast model: options, fitting, and the serializable record.

mod forecast_model;
mod options;
mod record;

pub use forecast_model::ForecastModel;
pub use options::{ModelOptions, Transform};
pub use record::{ModelRecord, WeightRecord};
