//! Window functions for shaping event masks.
//!
//! Instead of a hard 0/1 step, an event's active interval can be tapered by
//! a window evaluated at the normalized position inside the interval.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window applied across an event's active interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunction {
    /// Hard step: 1 everywhere inside the interval.
    #[default]
    Rectangular,
    Hann,
    Hamming,
    Blackman,
    BlackmanHarris,
}

impl WindowFunction {
    /// Evaluate the window at normalized position `u` in `[0, 1)`.
    ///
    /// Positions outside the interval return 0.
    pub fn evaluate(&self, u: f64) -> f64 {
        if !(0.0..1.0).contains(&u) {
            return 0.0;
        }
        let w = 2.0 * PI * u;
        match self {
            WindowFunction::Rectangular => 1.0,
            WindowFunction::Hann => 0.5 * (1.0 - w.cos()),
            WindowFunction::Hamming => 0.54 - 0.46 * w.cos(),
            WindowFunction::Blackman => 0.42 - 0.5 * w.cos() + 0.08 * (2.0 * w).cos(),
            WindowFunction::BlackmanHarris => {
                0.35875 - 0.48829 * w.cos() + 0.14128 * (2.0 * w).cos()
                    - 0.01168 * (3.0 * w).cos()
            }
        }
    }
}
