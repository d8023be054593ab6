//! Historical aggregate families.
//!
//! Four backward-looking aggregate families computed over the pre-fill
//! (observed-only) bucket values, grouped by a derived key and re-aligned
//! onto every grid timestamp by a lookup on that timestamp's own derived
//! key:
//!
//! 1. `prev_dia_com_*` — the full previous calendar day.
//! 2. `prev_dow_com_*` — the full week preceding the timestamp's week.
//! 3. `prev_dow_interval_*` — same time-of-day, keyed by the previous
//!    week's Monday.
//! 4. `prev_dow_day_*` — the same weekday pooled over the last 4 weeks.
//!
//! A failed family degrades to undefined columns (zero-filled by the
//! frame finalization) and is logged once; it never aborts the run.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;
use volumetria_core::{week_monday, Error, ResampledSeries, Result};

use crate::frame::FeatureFrame;
use crate::stats::{self, SummaryStats, METRIC_NAMES};

/// Append all four aggregate families to the frame.
///
/// Families are independent: a failure in one is logged and its columns
/// degrade to NaN while the others still compute.
pub fn append_historical_features(frame: &mut FeatureFrame, raw: &ResampledSeries) {
    let families: [(&str, Result<Vec<SummaryStats>>); 4] = [
        ("prev_dia_com", previous_day(raw)),
        ("prev_dow_com", previous_week(raw)),
        ("prev_dow_interval", previous_week_interval(raw)),
        ("prev_dow_day", same_weekday_pooled(raw)),
    ];
    for (prefix, outcome) in families {
        match outcome {
            Ok(rows) => push_family(frame, prefix, &rows),
            Err(e) => {
                warn!(family = prefix, error = %e, "historical aggregate family degraded");
                let undefined = vec![SummaryStats::undefined(); raw.len()];
                push_family(frame, prefix, &undefined);
            }
        }
    }
}

fn push_family(frame: &mut FeatureFrame, prefix: &str, rows: &[SummaryStats]) {
    for (m, metric) in METRIC_NAMES.iter().enumerate() {
        let values = rows.iter().map(|s| s.as_array()[m]).collect();
        frame.push_column(format!("{prefix}_{metric}"), values);
    }
}

/// Observed (timestamp, value) pairs of the pre-fill series.
fn observed_points(raw: &ResampledSeries) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
    raw.values()
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|value| (raw.timestamp_at(i), value)))
}

fn check_non_empty(raw: &ResampledSeries, family: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(Error::historical_aggregate(family, "empty series grid"));
    }
    Ok(())
}

/// Observed values grouped by calendar date.
fn values_by_date(raw: &ResampledSeries) -> BTreeMap<NaiveDate, Vec<f64>> {
    let mut groups: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for (ts, value) in observed_points(raw) {
        groups.entry(ts.date()).or_default().push(value);
    }
    groups
}

/// Family 1: metrics over the full previous calendar day.
pub fn previous_day(raw: &ResampledSeries) -> Result<Vec<SummaryStats>> {
    check_non_empty(raw, "prev_dia_com")?;
    let stats_by_date: BTreeMap<NaiveDate, SummaryStats> = values_by_date(raw)
        .into_iter()
        .map(|(date, values)| (date, stats::summarize(&values)))
        .collect();
    Ok(raw
        .timestamps()
        .map(|ts| {
            let key = ts.date() - Duration::days(1);
            stats_by_date
                .get(&key)
                .copied()
                .unwrap_or_else(SummaryStats::undefined)
        })
        .collect())
}

/// Family 2: metrics over the week preceding the timestamp's week.
///
/// Groups are keyed by the Monday of each observed week; the lookup key
/// is the Monday of the week before the timestamp's own.
pub fn previous_week(raw: &ResampledSeries) -> Result<Vec<SummaryStats>> {
    check_non_empty(raw, "prev_dow_com")?;
    let mut groups: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for (ts, value) in observed_points(raw) {
        groups.entry(week_monday(ts.date())).or_default().push(value);
    }
    let stats_by_monday: BTreeMap<NaiveDate, SummaryStats> = groups
        .into_iter()
        .map(|(monday, values)| (monday, stats::summarize(&values)))
        .collect();
    Ok(raw
        .timestamps()
        .map(|ts| {
            let key = week_monday(ts.date()) - Duration::days(7);
            stats_by_monday
                .get(&key)
                .copied()
                .unwrap_or_else(SummaryStats::undefined)
        })
        .collect())
}

/// Family 3: same time-of-day, keyed by the previous week's Monday.
///
/// Each observation is grouped under (Monday of its previous week, its
/// time-of-day); the lookup uses the same derivation on the timestamp.
pub fn previous_week_interval(raw: &ResampledSeries) -> Result<Vec<SummaryStats>> {
    check_non_empty(raw, "prev_dow_interval")?;
    let mut groups: BTreeMap<(NaiveDate, NaiveTime), Vec<f64>> = BTreeMap::new();
    for (ts, value) in observed_points(raw) {
        let key = (week_monday(ts.date()) - Duration::days(7), ts.time());
        groups.entry(key).or_default().push(value);
    }
    let stats_by_key: BTreeMap<(NaiveDate, NaiveTime), SummaryStats> = groups
        .into_iter()
        .map(|(key, values)| (key, stats::summarize(&values)))
        .collect();
    Ok(raw
        .timestamps()
        .map(|ts| {
            let key = (week_monday(ts.date()) - Duration::days(7), ts.time());
            stats_by_key
                .get(&key)
                .copied()
                .unwrap_or_else(SummaryStats::undefined)
        })
        .collect())
}

/// Family 4: same weekday pooled over the last 4 occurrences.
///
/// For each timestamp, the full-day value arrays of date - 7k days
/// (k = 1..4) that have data are concatenated and summarized together.
/// With no prior occurrence the row is undefined.
pub fn same_weekday_pooled(raw: &ResampledSeries) -> Result<Vec<SummaryStats>> {
    check_non_empty(raw, "prev_dow_day")?;
    let date_values = values_by_date(raw);
    Ok(raw
        .timestamps()
        .map(|ts| {
            let mut pooled = Vec::new();
            for k in 1..=4 {
                let day = ts.date() - Duration::days(7 * k);
                if let Some(values) = date_values.get(&day) {
                    pooled.extend_from_slice(values);
                }
            }
            if pooled.is_empty() {
                SummaryStats::undefined()
            } else {
                stats::summarize(&pooled)
            }
        })
        .collect())
}
