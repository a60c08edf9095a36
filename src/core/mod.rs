//! Core data structures.

mod prediction;
mod time_series;

pub use prediction::Prediction;
pub use time_series::TimeSeries;
