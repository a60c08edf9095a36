//! Time-indexed feature generation.
//!
//! Turns timestamps and per-series configuration into a named design matrix:
//! growth and changepoint trend bases, Fourier seasonality, and
//! event/holiday/weekend masks.

mod event;
mod feature;
mod generator;
mod matrix;
mod options;
mod window;

pub use event::Event;
pub use feature::{
    ChangepointComponent, Feature, FeatureKind, FourierComponent, GrowthTerm,
};
pub use generator::FeatureGenerator;
pub use matrix::FeatureMatrix;
pub use options::{
    Changepoint, DstOptions, EventOptions, FeatureConfig, GrowthType, SeasonalityConfig,
    WeekendOptions,
};
pub use window::WindowFunction;
