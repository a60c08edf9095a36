//! Calendar collaborators consumed by feature generation.
//!
//! Holiday dates and timezone offsets come from outside the core: callers
//! inject implementations of the traits here, and the core only consumes the
//! resulting (name, date) pairs and offset durations. `FixedOffsets` is a
//! table-driven provider suitable for tests and simple deployments.

use crate::error::{ForecastError, Result};
use crate::features::Event;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;

/// Lookup for observed holiday dates.
///
/// Given a holiday name and a year, returns the observed date (shifted for
/// weekends etc. by the implementation) or `None` when the holiday does not
/// occur in that year.
pub trait HolidayLookup {
    fn observed(&self, name: &str, year: i32) -> Option<NaiveDate>;
}

/// Timezone offset resolution.
///
/// `utc_offset` is the full local offset from UTC at the given instant;
/// `dst_offset` is only the daylight-saving component (zero in standard
/// time). Both are instant-dependent for zones with transitions.
pub trait TimezoneProvider {
    fn utc_offset(&self, zone: &str, at: DateTime<Utc>) -> Result<Duration>;
    fn dst_offset(&self, zone: &str, at: DateTime<Utc>) -> Result<Duration>;
}

/// Provider that only resolves UTC (and the empty string) to zero offsets.
///
/// The default when no real timezone database is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcOnly;

impl TimezoneProvider for UtcOnly {
    fn utc_offset(&self, zone: &str, _at: DateTime<Utc>) -> Result<Duration> {
        if zone.is_empty() || zone == "UTC" {
            Ok(Duration::zero())
        } else {
            Err(ForecastError::UnknownTimezone(zone.to_string()))
        }
    }

    fn dst_offset(&self, zone: &str, at: DateTime<Utc>) -> Result<Duration> {
        self.utc_offset(zone, at)
    }
}

/// One zone's offset table: a base offset plus DST intervals.
#[derive(Debug, Clone)]
struct ZoneTable {
    base_offset: Duration,
    /// Half-open `[start, end)` intervals during which the DST offset applies.
    dst_intervals: Vec<(DateTime<Utc>, DateTime<Utc>, Duration)>,
}

impl Default for ZoneTable {
    fn default() -> Self {
        Self {
            base_offset: Duration::zero(),
            dst_intervals: Vec::new(),
        }
    }
}

/// Table-driven `TimezoneProvider`.
#[derive(Debug, Clone, Default)]
pub struct FixedOffsets {
    zones: HashMap<String, ZoneTable>,
}

impl FixedOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone with a fixed base offset in seconds east of UTC.
    pub fn with_zone(mut self, name: &str, base_offset_secs: i64) -> Self {
        self.zones
            .entry(name.to_string())
            .or_default()
            .base_offset = Duration::seconds(base_offset_secs);
        self
    }

    /// Add a DST interval `[start, end)` with the given offset in seconds.
    pub fn with_dst_interval(
        mut self,
        name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        offset_secs: i64,
    ) -> Self {
        self.zones
            .entry(name.to_string())
            .or_default()
            .dst_intervals
            .push((start, end, Duration::seconds(offset_secs)));
        self
    }

    fn table(&self, zone: &str) -> Result<&ZoneTable> {
        self.zones
            .get(zone)
            .ok_or_else(|| ForecastError::UnknownTimezone(zone.to_string()))
    }
}

impl TimezoneProvider for FixedOffsets {
    fn utc_offset(&self, zone: &str, at: DateTime<Utc>) -> Result<Duration> {
        let table = self.table(zone)?;
        let dst = dst_at(table, at);
        Ok(table.base_offset + dst)
    }

    fn dst_offset(&self, zone: &str, at: DateTime<Utc>) -> Result<Duration> {
        Ok(dst_at(self.table(zone)?, at))
    }
}

fn dst_at(table: &ZoneTable, at: DateTime<Utc>) -> Duration {
    table
        .dst_intervals
        .iter()
        .find(|(start, end, _)| at >= *start && at < *end)
        .map(|(_, _, offset)| *offset)
        .unwrap_or_else(Duration::zero)
}

/// Build one event per year for a named holiday.
///
/// Each event covers the observed date's full day, widened by the given
/// buffers. Events share the holiday's name so the generator merges them
/// into a single indicator column with one learned coefficient.
pub fn holiday_events<L: HolidayLookup + ?Sized>(
    lookup: &L,
    name: &str,
    years: impl IntoIterator<Item = i32>,
    before: Duration,
    after: Duration,
) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for year in years {
        let Some(date) = lookup.observed(name, year) else {
            continue;
        };
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ForecastError::TimestampError(format!("bad holiday date {date}")))?
            .and_utc();
        events.push(Event::new(
            name,
            midnight - before,
            midnight + Duration::days(1) + after,
        )?);
    }
    Ok(events)
}
