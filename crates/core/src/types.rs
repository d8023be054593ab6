//! Core data types for the volumetria pipeline.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Floor a timestamp onto the fixed-frequency grid.
///
/// Grid buckets are aligned to multiples of `freq_secs` since the Unix
/// epoch, which coincides with midnight alignment for any frequency that
/// divides a day evenly.
#[inline]
pub fn floor_to_grid(ts: NaiveDateTime, freq_secs: i64) -> NaiveDateTime {
    let rem = ts.and_utc().timestamp().rem_euclid(freq_secs);
    ts - Duration::seconds(rem)
}

/// Monday of the week containing the given date.
#[inline]
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// A single logged observation of API call volume.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRecord {
    /// Calendar year.
    pub anio: i32,
    /// Calendar month (1-12).
    pub mes: u32,
    /// Calendar day of month (1-31).
    pub dia: u32,
    /// Time of day, `HH:MM:SS` (or `HH:MM`).
    pub hora: String,
    /// Entity identifier.
    pub api_name: String,
    /// Family identifier.
    pub familia: String,
    /// Non-negative call count.
    pub llamados: i64,
}

impl RawRecord {
    /// Build the record's timestamp from its calendar fields.
    pub fn timestamp(&self) -> Result<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(self.anio, self.mes, self.dia).ok_or_else(|| {
            Error::data(format!(
                "invalid calendar date {}-{}-{}",
                self.anio, self.mes, self.dia
            ))
        })?;
        let time = parse_time_of_day(&self.hora)?;
        Ok(date.and_time(time))
    }
}

/// Parse a time-of-day string as `HH:MM:SS`, falling back to `HH:MM`.
pub fn parse_time_of_day(hora: &str) -> Result<NaiveTime> {
    let trimmed = hora.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| Error::data(format!("invalid time of day: {hora:?}")))
}

/// A fixed-frequency series with missing entries where no raw record fell
/// in the interval.
///
/// The grid spans the group's minimum to maximum bucket with constant
/// spacing; `None` marks an unobserved interval. Aggregation within a
/// bucket is a sum over the interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledSeries {
    start: NaiveDateTime,
    freq_secs: i64,
    values: Vec<Option<f64>>,
}

impl ResampledSeries {
    /// Create a new resampled series. `start` must already lie on the grid.
    pub fn new(start: NaiveDateTime, freq_secs: i64, values: Vec<Option<f64>>) -> Self {
        Self {
            start,
            freq_secs,
            values,
        }
    }

    /// First grid timestamp.
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Grid spacing in seconds.
    pub fn freq_secs(&self) -> i64 {
        self.freq_secs
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no grid points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bucket values, `None` where unobserved.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Timestamp of the i-th grid point.
    pub fn timestamp_at(&self, idx: usize) -> NaiveDateTime {
        self.start + Duration::seconds(self.freq_secs * idx as i64)
    }

    /// Iterator over all grid timestamps.
    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..self.values.len()).map(|i| self.timestamp_at(i))
    }

    /// Grid index of an exactly-matching timestamp, if it lies on this grid.
    pub fn index_of(&self, ts: NaiveDateTime) -> Option<usize> {
        let delta = (ts - self.start).num_seconds();
        if delta < 0 || delta % self.freq_secs != 0 {
            return None;
        }
        let idx = (delta / self.freq_secs) as usize;
        (idx < self.values.len()).then_some(idx)
    }

    /// Observed value at an exactly-matching timestamp.
    ///
    /// `None` when the timestamp is off-grid, out of range, or unobserved.
    pub fn value_at(&self, ts: NaiveDateTime) -> Option<f64> {
        self.index_of(ts).and_then(|i| self.values[i])
    }
}

/// A resampled series with its gaps filled.
///
/// Missing entries carry the last observed value forward; leading gaps
/// before the first observation are zero. Constructed once per group by
/// the resampler and not mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledSeries {
    start: NaiveDateTime,
    freq_secs: i64,
    values: Vec<f64>,
}

impl FilledSeries {
    /// Create a new filled series. `start` must already lie on the grid.
    pub fn new(start: NaiveDateTime, freq_secs: i64, values: Vec<f64>) -> Self {
        Self {
            start,
            freq_secs,
            values,
        }
    }

    /// First grid timestamp.
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Grid spacing in seconds.
    pub fn freq_secs(&self) -> i64 {
        self.freq_secs
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no grid points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Filled values, one per grid point.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Timestamp of the i-th grid point.
    pub fn timestamp_at(&self, idx: usize) -> NaiveDateTime {
        self.start + Duration::seconds(self.freq_secs * idx as i64)
    }

    /// Iterator over all grid timestamps.
    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..self.values.len()).map(|i| self.timestamp_at(i))
    }
}

/// Grid points for which at least one raw record existed in the interval.
///
/// Derived alongside the filled series; used only to produce the imputed
/// flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedSet {
    flags: Vec<bool>,
}

impl ObservedSet {
    /// Create an observed set from per-grid-point flags.
    pub fn new(flags: Vec<bool>) -> Self {
        Self { flags }
    }

    /// Whether the i-th grid point had a raw observation.
    pub fn is_observed(&self, idx: usize) -> bool {
        self.flags.get(idx).copied().unwrap_or(false)
    }

    /// Number of grid points covered.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether the set covers no grid points.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Number of observed grid points.
    pub fn observed_count(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }
}

/// Resampler output for one (entity, family) group.
#[derive(Debug, Clone)]
pub struct GroupSeries {
    /// Pre-fill bucket sums (consumed by the historical aggregates).
    pub resampled: ResampledSeries,
    /// Carry-forward-filled values (consumed by everything else).
    pub filled: FilledSeries,
    /// Which grid points were actually observed.
    pub observed: ObservedSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_floor_to_grid() {
        // 5-minute grid
        assert_eq!(dt("2025-03-01 10:03:40").and_utc().timestamp() % 60, 40);
        assert_eq!(floor_to_grid(dt("2025-03-01 10:03:40"), 300), dt("2025-03-01 10:00:00"));
        assert_eq!(floor_to_grid(dt("2025-03-01 10:05:00"), 300), dt("2025-03-01 10:05:00"));
        // daily grid
        assert_eq!(floor_to_grid(dt("2025-03-01 23:59:59"), 86_400), dt("2025-03-01 00:00:00"));
    }

    #[test]
    fn test_week_monday() {
        // 2025-03-05 is a Wednesday
        let wed = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(week_monday(wed), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        let mon = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        assert_eq!(week_monday(mon), mon);
    }

    #[test]
    fn test_record_timestamp() {
        let record = RawRecord {
            anio: 2025,
            mes: 3,
            dia: 1,
            hora: "08:35:00".to_string(),
            api_name: "api_A".to_string(),
            familia: "fam1".to_string(),
            llamados: 12,
        };
        assert_eq!(record.timestamp().unwrap(), dt("2025-03-01 08:35:00"));
    }

    #[test]
    fn test_record_timestamp_short_time() {
        let record = RawRecord {
            anio: 2025,
            mes: 3,
            dia: 1,
            hora: "08:35".to_string(),
            api_name: "api_A".to_string(),
            familia: "fam1".to_string(),
            llamados: 12,
        };
        assert_eq!(record.timestamp().unwrap(), dt("2025-03-01 08:35:00"));
    }

    #[test]
    fn test_record_invalid_date() {
        let record = RawRecord {
            anio: 2025,
            mes: 2,
            dia: 30,
            hora: "08:35:00".to_string(),
            api_name: "api_A".to_string(),
            familia: "fam1".to_string(),
            llamados: 12,
        };
        assert!(record.timestamp().is_err());
    }

    #[test]
    fn test_resampled_series_lookup() {
        let series = ResampledSeries::new(
            dt("2025-03-01 00:00:00"),
            300,
            vec![Some(1.0), None, Some(3.0)],
        );
        assert_eq!(series.len(), 3);
        assert_eq!(series.timestamp_at(2), dt("2025-03-01 00:10:00"));
        assert_eq!(series.value_at(dt("2025-03-01 00:00:00")), Some(1.0));
        // gap
        assert_eq!(series.value_at(dt("2025-03-01 00:05:00")), None);
        // off-grid
        assert_eq!(series.value_at(dt("2025-03-01 00:01:00")), None);
        // out of range
        assert_eq!(series.value_at(dt("2025-03-01 00:15:00")), None);
    }

    #[test]
    fn test_observed_set_counts() {
        let observed = ObservedSet::new(vec![true, false, true]);
        assert!(observed.is_observed(0));
        assert!(!observed.is_observed(1));
        assert!(!observed.is_observed(10));
        assert_eq!(observed.observed_count(), 2);
    }
}
