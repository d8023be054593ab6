//! Pipeline orchestration.
//!
//! One deterministic batch transformation: load raw historic records,
//! discover every (entity, family) group, resample and build features per
//! group, attach family-level aggregates, concatenate and write the
//! output table plus its manifest. Groups are processed independently in
//! enumeration order; family series are fully precomputed before the
//! group loop so group processing only ever reads them.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{info, warn};
use volumetria_core::{Error, PipelineConfig, ResampledSeries, Result};
use volumetria_features::{rolling, FeatureBuilder, FeatureColumn};
use volumetria_ingestion::{
    dedup_records, distinct_families, enumerate_groups, read_historic, Resampler,
};

use crate::output::{self, Manifest, OutputTable};

/// Run the pipeline from a YAML config path and return the output path.
///
/// This is the single entry point for external schedulers; it performs no
/// scheduling, retry, or database I/O itself.
pub fn build_and_save_features(config_path: &Path) -> Result<PathBuf> {
    let config = PipelineConfig::from_path(config_path)?;
    run(&config)
}

/// Run the pipeline with an already-loaded configuration.
pub fn run(config: &PipelineConfig) -> Result<PathBuf> {
    let freq_secs = config.features.freq_secs()?;
    fs::create_dir_all(&config.output_dir)?;

    let records = dedup_records(read_historic(&config.historic_path)?);
    info!(rows = records.len(), "loaded historic records");

    let groups = enumerate_groups(&records);
    let families = distinct_families(&records);
    let resampler = Resampler::new(freq_secs);

    // Family series are precomputed in full before any group features are
    // derived; the group loop only reads them.
    let mut family_series: HashMap<String, ResampledSeries> = HashMap::new();
    for familia in &families {
        match resampler.resample_family(&records, familia) {
            Ok(series) => {
                family_series.insert(familia.clone(), series);
            }
            Err(e) => warn!(familia = %familia, error = %e, "family series unavailable"),
        }
    }

    let builder = FeatureBuilder::new(&config.features, &config.holiday_country);
    let mut table = OutputTable::new();

    for (api_name, familia) in &groups {
        let group = match resampler.resample_group(&records, api_name, familia) {
            Ok(group) => group,
            Err(Error::EmptySeries(message)) => {
                warn!(api_name = %api_name, familia = %familia, %message, "skipping group");
                continue;
            }
            Err(e) => return Err(e),
        };
        let frame = builder.build(&group)?;

        let imputed: Vec<i64> = (0..frame.num_rows())
            .map(|i| if group.observed.is_observed(i) { 0 } else { 1 })
            .collect();

        let family_features = match family_series.get(familia) {
            Some(series) => family_rolling_means(series, frame.index(), &config.features.rolling_windows),
            None => Vec::new(),
        };

        table.append_group(api_name, familia, frame, imputed, family_features);
    }

    let out_path = config.output_dir.join("features.parquet");
    let (rows, cols) = output::write_parquet(&table, &out_path)?;
    let manifest = Manifest {
        rows,
        cols,
        path: out_path.display().to_string(),
    };
    output::write_manifest(&manifest, &config.output_dir.join("manifest.yaml"))?;
    info!(rows, cols, groups = table.num_groups(), path = %out_path.display(), "saved feature table");

    Ok(out_path)
}

/// Family-level rolling means aligned onto a group's grid.
///
/// The family series is aligned by exact timestamp match, forward-filled
/// across the aligned values and zero-filled at the head, then averaged
/// with the same trailing windows used for the group features.
fn family_rolling_means(
    series: &ResampledSeries,
    index: &[NaiveDateTime],
    windows: &[usize],
) -> Vec<FeatureColumn> {
    let mut last: Option<f64> = None;
    let aligned: Vec<f64> = index
        .iter()
        .map(|ts| match series.value_at(*ts) {
            Some(v) => {
                last = Some(v);
                v
            }
            None => last.unwrap_or(0.0),
        })
        .collect();
    windows
        .iter()
        .map(|w| FeatureColumn {
            name: format!("family_roll_mean_{w}"),
            values: rolling::rolling_mean(&aligned, *w),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_family_alignment_fills_gaps() {
        let series = ResampledSeries::new(
            dt("2025-03-01 00:00:00"),
            300,
            vec![Some(10.0), None, Some(30.0)],
        );
        // group grid starts one step before the family series
        let index: Vec<NaiveDateTime> = (0..4)
            .map(|i| dt("2025-02-28 23:55:00") + chrono::Duration::seconds(300 * i))
            .collect();
        let columns = family_rolling_means(&series, &index, &[1]);
        assert_eq!(columns.len(), 1);
        let values = &columns[0].values;
        assert_relative_eq!(values[0], 0.0); // before the family span
        assert_relative_eq!(values[1], 10.0);
        assert_relative_eq!(values[2], 10.0); // gap carried forward
        assert_relative_eq!(values[3], 30.0);
    }

    #[test]
    fn test_family_rolling_window() {
        let series = ResampledSeries::new(
            dt("2025-03-01 00:00:00"),
            300,
            vec![Some(2.0), Some(4.0), Some(6.0)],
        );
        let index: Vec<NaiveDateTime> = (0..3)
            .map(|i| dt("2025-03-01 00:00:00") + chrono::Duration::seconds(300 * i))
            .collect();
        let columns = family_rolling_means(&series, &index, &[2, 3]);
        assert_eq!(columns[0].name, "family_roll_mean_2");
        assert_relative_eq!(columns[0].values[2], 5.0);
        assert_eq!(columns[1].name, "family_roll_mean_3");
        assert_relative_eq!(columns[1].values[2], 4.0);
    }
}
