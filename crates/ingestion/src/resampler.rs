//! Time-grid resampling of raw records.
//!
//! Converts irregular per-entity event rows into a complete, evenly-spaced
//! series: bucket sums on the configured frequency, a full grid from the
//! group's minimum to maximum bucket, and a carry-forward fill with the
//! observed points recorded alongside.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use volumetria_core::{
    floor_to_grid, Error, FilledSeries, GroupSeries, ObservedSet, RawRecord, ResampledSeries,
    Result,
};

/// Resamples raw records onto a fixed-frequency grid.
pub struct Resampler {
    freq_secs: i64,
}

impl Resampler {
    /// Create a resampler for the given grid step.
    pub fn new(freq_secs: i64) -> Self {
        Self { freq_secs }
    }

    /// Resample one (entity, family) group.
    ///
    /// Fails with `EmptySeries` when no records match the filter; the
    /// caller skips the group and continues.
    pub fn resample_group(
        &self,
        records: &[RawRecord],
        api_name: &str,
        familia: &str,
    ) -> Result<GroupSeries> {
        let sums = self.bucket_sums(
            records
                .iter()
                .filter(|r| r.api_name == api_name && r.familia == familia),
        )?;
        if sums.is_empty() {
            return Err(Error::empty_series(format!(
                "no records for entity {api_name:?} in family {familia:?}"
            )));
        }
        let resampled = self.materialize(&sums);
        let observed = ObservedSet::new(resampled.values().iter().map(Option::is_some).collect());
        let filled = fill_forward(&resampled);
        Ok(GroupSeries {
            resampled,
            filled,
            observed,
        })
    }

    /// Resample all records of a family across entities.
    ///
    /// Used for the family-level aggregate features; same bucket-sum and
    /// grid semantics as a group series, without the fill.
    pub fn resample_family(&self, records: &[RawRecord], familia: &str) -> Result<ResampledSeries> {
        let sums = self.bucket_sums(records.iter().filter(|r| r.familia == familia))?;
        if sums.is_empty() {
            return Err(Error::empty_series(format!(
                "no records for family {familia:?}"
            )));
        }
        Ok(self.materialize(&sums))
    }

    /// Sum counts falling into the same grid bucket.
    fn bucket_sums<'a>(
        &self,
        records: impl Iterator<Item = &'a RawRecord>,
    ) -> Result<BTreeMap<NaiveDateTime, f64>> {
        let mut sums = BTreeMap::new();
        for record in records {
            let bucket = floor_to_grid(record.timestamp()?, self.freq_secs);
            *sums.entry(bucket).or_insert(0.0) += record.llamados as f64;
        }
        Ok(sums)
    }

    /// Materialize the full grid from the minimum to the maximum bucket.
    fn materialize(&self, sums: &BTreeMap<NaiveDateTime, f64>) -> ResampledSeries {
        // sums is non-empty here; both bounds exist
        let (first, last) = match (sums.keys().next(), sums.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return ResampledSeries::new(NaiveDateTime::default(), self.freq_secs, Vec::new()),
        };
        let n = ((last - first).num_seconds() / self.freq_secs) as usize + 1;
        let values = (0..n)
            .map(|i| {
                let ts = first + chrono::Duration::seconds(self.freq_secs * i as i64);
                sums.get(&ts).copied()
            })
            .collect();
        ResampledSeries::new(first, self.freq_secs, values)
    }
}

/// Carry the last observed value forward into each gap; leading gaps
/// before the first observation are zero.
fn fill_forward(resampled: &ResampledSeries) -> FilledSeries {
    let mut last: Option<f64> = None;
    let values = resampled
        .values()
        .iter()
        .map(|value| match value {
            Some(v) => {
                last = Some(*v);
                *v
            }
            None => last.unwrap_or(0.0),
        })
        .collect();
    FilledSeries::new(resampled.start(), resampled.freq_secs(), values)
}
