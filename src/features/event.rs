//! Named event intervals used to build indicator features.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named half-open interval `[start, end)`.
///
/// Events with the same name are merged into a single indicator column by
/// the feature generator, sharing one learned coefficient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    name: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Event {
    /// Create a validated event. The name must be non-empty and the interval
    /// must not be inverted.
    pub fn new(name: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if name.is_empty() {
            return Err(ForecastError::InvalidEvent {
                name: "<unnamed>".to_string(),
                reason: "name must not be empty".to_string(),
            });
        }
        if start > end {
            return Err(ForecastError::InvalidEvent {
                name: name.to_string(),
                reason: "start after end".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            start,
            end,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Re-run validation, for events deserialized from a model record.
    pub fn validate(&self) -> Result<()> {
        Self::new(&self.name, self.start, self.end).map(|_| ())
    }
}
