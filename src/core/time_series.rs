//! TimeSeries data structure for representing temporal data.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};

/// A univariate time series with timestamps and values.
///
/// Values may be NaN, which marks an observation as missing. Fitting code
/// always works on an owned clone of the values so caller buffers are never
/// aliased or mutated.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a new TimeSeries.
    ///
    /// Timestamps must be strictly increasing and the same length as the
    /// values. Values may contain NaN (missing observations).
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if timestamps.len() != values.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: timestamps.len(),
                got: values.len(),
            });
        }
        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(ForecastError::TimestampError(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }

        Ok(Self { timestamps, values })
    }

    /// Copy from borrowed slices, detaching from the caller's buffers.
    pub fn from_slices(timestamps: &[DateTime<Utc>], values: &[f64]) -> Result<Self> {
        Self::new(timestamps.to_vec(), values.to_vec())
    }

    /// Number of observations, including missing ones.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Timestamps in order.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Values aligned with `timestamps()`. NaN marks a missing observation.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable access to values, used by the outlier loop to mask points.
    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// First timestamp.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.timestamps[0]
    }

    /// Last timestamp.
    pub fn end_time(&self) -> DateTime<Utc> {
        *self.timestamps.last().expect("validated non-empty")
    }

    /// Number of observations with a finite value.
    pub fn observed_len(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    /// Drop missing-value rows, returning paired (timestamps, values).
    pub fn observed(&self) -> (Vec<DateTime<Utc>>, Vec<f64>) {
        let mut ts = Vec::with_capacity(self.len());
        let mut vs = Vec::with_capacity(self.len());
        for (t, &v) in self.timestamps.iter().zip(self.values.iter()) {
            if v.is_finite() {
                ts.push(*t);
                vs.push(v);
            }
        }
        (ts, vs)
    }
}
