//! Configuration records for feature generation.
//!
//! Every record has documented defaults and builder-style `with_*` methods;
//! callers start from `Default` and override what they need. Durations are
//! stored as whole seconds so configurations serialize cleanly.

use crate::features::{Event, WindowFunction};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One periodic component: N sin/cos harmonic pairs at a fundamental period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityConfig {
    /// Component name, e.g. "daily".
    pub name: String,
    /// Fundamental period in seconds.
    pub period_secs: f64,
    /// Number of harmonics (sin/cos pairs).
    pub fourier_order: usize,
}

impl SeasonalityConfig {
    pub fn new(name: &str, period: Duration, fourier_order: usize) -> Self {
        Self {
            name: name.to_string(),
            period_secs: period.num_seconds() as f64,
            fourier_order,
        }
    }

    /// Daily seasonality with the given number of harmonics.
    pub fn daily(fourier_order: usize) -> Self {
        Self::new("daily", Duration::days(1), fourier_order)
    }

    /// Weekly seasonality with the given number of harmonics.
    pub fn weekly(fourier_order: usize) -> Self {
        Self::new("weekly", Duration::days(7), fourier_order)
    }
}

/// A named timestamp where the trend basis switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changepoint {
    pub name: String,
    pub at: DateTime<Utc>,
}

impl Changepoint {
    pub fn new(name: &str, at: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            at,
        }
    }
}

/// Polynomial growth terms beyond the always-present intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthType {
    /// Intercept only.
    Flat,
    /// Intercept plus a linear time term.
    #[default]
    Linear,
    /// Intercept plus linear and quadratic time terms.
    Quadratic,
}

/// Shaping applied to every configured event's mask.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventOptions {
    /// Widen each event's interval backwards by this many seconds.
    pub before_secs: i64,
    /// Widen each event's interval forwards by this many seconds.
    pub after_secs: i64,
    /// Taper applied across the widened interval.
    pub window: WindowFunction,
}

/// Weekend masking by local day-of-week.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeekendOptions {
    pub enabled: bool,
    /// Extend the mask into Friday by this many seconds (capped at 24h).
    pub before_secs: i64,
    /// Extend the mask into Monday by this many seconds (capped at 24h).
    pub after_secs: i64,
    /// Timezone whose local clock defines the weekend; UTC when unset.
    pub timezone: Option<String>,
}

/// DST-aware time adjustment for periodic features.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DstOptions {
    pub enabled: bool,
    /// Zones whose DST offsets are averaged into the adjustment.
    pub timezones: Vec<String>,
}

/// Full feature-generation configuration for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub growth: GrowthType,
    pub seasonalities: Vec<SeasonalityConfig>,
    /// Explicit changepoints. When empty and `auto_changepoints > 0`, that
    /// many changepoints are placed evenly across the training span.
    pub changepoints: Vec<Changepoint>,
    pub auto_changepoints: usize,
    pub events: Vec<Event>,
    pub event_options: EventOptions,
    pub weekend: WeekendOptions,
    pub dst: DstOptions,
}

impl Default for FeatureConfig {
    /// Linear growth with daily (12 harmonics) and weekly (6 harmonics)
    /// seasonality; no changepoints, events, weekend, or DST handling.
    fn default() -> Self {
        Self {
            growth: GrowthType::Linear,
            seasonalities: vec![SeasonalityConfig::daily(12), SeasonalityConfig::weekly(6)],
            changepoints: Vec::new(),
            auto_changepoints: 0,
            events: Vec::new(),
            event_options: EventOptions::default(),
            weekend: WeekendOptions::default(),
            dst: DstOptions::default(),
        }
    }
}

impl FeatureConfig {
    pub fn with_growth(mut self, growth: GrowthType) -> Self {
        self.growth = growth;
        self
    }

    pub fn with_seasonalities(mut self, seasonalities: Vec<SeasonalityConfig>) -> Self {
        self.seasonalities = seasonalities;
        self
    }

    pub fn with_changepoints(mut self, changepoints: Vec<Changepoint>) -> Self {
        self.changepoints = changepoints;
        self
    }

    pub fn with_auto_changepoints(mut self, count: usize) -> Self {
        self.auto_changepoints = count;
        self
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    pub fn with_event_options(mut self, options: EventOptions) -> Self {
        self.event_options = options;
        self
    }

    pub fn with_weekend(mut self, weekend: WeekendOptions) -> Self {
        self.weekend = weekend;
        self
    }

    pub fn with_dst(mut self, dst: DstOptions) -> Self {
        self.dst = dst;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_daily_and_weekly() {
        let config = FeatureConfig::default();
        assert_eq!(config.growth, GrowthType::Linear);
        assert_eq!(config.seasonalities.len(), 2);
        assert_eq!(config.seasonalities[0].name, "daily");
        assert_eq!(config.seasonalities[0].period_secs, 86_400.0);
        assert_eq!(config.seasonalities[1].name, "weekly");
        assert_eq!(config.seasonalities[1].period_secs, 604_800.0);
        assert!(config.changepoints.is_empty());
        assert!(!config.weekend.enabled);
        assert!(!config.dst.enabled);
    }

    #[test]
    fn builder_overrides() {
        let config = FeatureConfig::default()
            .with_growth(GrowthType::Flat)
            .with_seasonalities(vec![SeasonalityConfig::daily(3)])
            .with_auto_changepoints(4);

        assert_eq!(config.growth, GrowthType::Flat);
        assert_eq!(config.seasonalities.len(), 1);
        assert_eq!(config.auto_changepoints, 4);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = FeatureConfig::default().with_auto_changepoints(2);
        let json = serde_json::to_string(&config).unwrap();
        let back: FeatureConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
