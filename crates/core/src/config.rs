//! Configuration structures for the volumetria pipeline.
//!
//! One immutable configuration value is loaded per run and passed by
//! reference to every component entry point; there is no ambient state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Raw historic data: a CSV/spreadsheet file or a directory of them.
    pub historic_path: PathBuf,
    /// Directory the feature table and manifest are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Feature engineering parameters.
    #[serde(default)]
    pub features: FeatureConfig,
    /// Country code for the public-holiday calendar.
    #[serde(default = "default_holiday_country")]
    pub holiday_country: String,
    /// Optional downstream-load collaborator settings.
    #[serde(default)]
    pub loader: Option<LoaderConfig>,
}

impl PipelineConfig {
    /// Load and validate a configuration from a YAML document.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        let config: PipelineConfig = serde_yaml::from_str(&text)
            .map_err(|e| Error::config(format!("malformed config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.historic_path.as_os_str().is_empty() {
            return Err(Error::config("historic_path must not be empty"));
        }
        self.features.freq_secs()?;
        Ok(())
    }
}

/// Feature engineering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Grid step, e.g. `"5min"`, `"30s"`, `"1h"`.
    #[serde(default = "default_freq")]
    pub freq: String,
    /// Lag offsets in grid periods, in output order.
    #[serde(default = "default_lag_list")]
    pub lag_list: Vec<usize>,
    /// Rolling window widths in grid periods, in output order.
    #[serde(default = "default_rolling_windows")]
    pub rolling_windows: Vec<usize>,
    /// EMA spans in grid periods; may be empty.
    #[serde(default)]
    pub ema_spans: Vec<usize>,
    /// Override for the previous-day shift in grid periods.
    #[serde(default)]
    pub prev_day_shift: Option<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            freq: default_freq(),
            lag_list: default_lag_list(),
            rolling_windows: default_rolling_windows(),
            ema_spans: Vec::new(),
            prev_day_shift: None,
        }
    }
}

impl FeatureConfig {
    /// Grid step in seconds.
    pub fn freq_secs(&self) -> Result<i64> {
        parse_freq(&self.freq)
    }

    /// Number of grid periods in one day (integer division).
    pub fn periods_per_day(&self) -> Result<usize> {
        Ok((86_400 / self.freq_secs()?) as usize)
    }

    /// Shift used for the previous-day feature, in grid periods.
    ///
    /// Derived from the grid frequency unless explicitly overridden.
    pub fn prev_day_periods(&self) -> Result<usize> {
        match self.prev_day_shift {
            Some(shift) => Ok(shift),
            None => self.periods_per_day(),
        }
    }
}

/// Downstream-load collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Which query executor to use.
    pub backend: LoaderBackend,
    /// Database path (or `:memory:`).
    pub database: String,
    /// Target table name.
    pub table: String,
}

/// Query executor selection, made by configuration at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderBackend {
    Sqlite,
    Duckdb,
}

/// Parse a grid-step string such as `"5min"`, `"30s"`, `"1h"` or `"1d"`
/// into seconds.
pub fn parse_freq(freq: &str) -> Result<i64> {
    let lower = freq.trim().to_ascii_lowercase();
    let digits: String = lower.chars().take_while(|c| c.is_ascii_digit()).collect();
    let unit = &lower[digits.len()..];
    let amount: i64 = digits
        .parse()
        .map_err(|_| Error::config(format!("invalid freq: {freq:?}")))?;
    let unit_secs = match unit {
        "s" | "sec" => 1,
        "min" | "t" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => return Err(Error::config(format!("invalid freq unit: {freq:?}"))),
    };
    let secs = amount * unit_secs;
    if secs <= 0 {
        return Err(Error::config(format!("freq must be positive: {freq:?}")));
    }
    Ok(secs)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("feature_pipeline_output")
}

fn default_holiday_country() -> String {
    "CO".to_string()
}

fn default_freq() -> String {
    "5min".to_string()
}

fn default_lag_list() -> Vec<usize> {
    vec![1, 2, 3, 6, 12]
}

fn default_rolling_windows() -> Vec<usize> {
    vec![12, 36, 288]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_freq() {
        assert_eq!(parse_freq("5min").unwrap(), 300);
        assert_eq!(parse_freq("30s").unwrap(), 30);
        assert_eq!(parse_freq("1h").unwrap(), 3_600);
        assert_eq!(parse_freq("1D").unwrap(), 86_400);
        assert!(parse_freq("five minutes").is_err());
        assert!(parse_freq("0min").is_err());
    }

    #[test]
    fn test_feature_defaults() {
        let config = FeatureConfig::default();
        assert_eq!(config.freq, "5min");
        assert_eq!(config.lag_list, vec![1, 2, 3, 6, 12]);
        assert_eq!(config.rolling_windows, vec![12, 36, 288]);
        assert!(config.ema_spans.is_empty());
        assert_eq!(config.periods_per_day().unwrap(), 288);
        assert_eq!(config.prev_day_periods().unwrap(), 288);
    }

    #[test]
    fn test_prev_day_override() {
        let config = FeatureConfig {
            prev_day_shift: Some(100),
            ..FeatureConfig::default()
        };
        assert_eq!(config.prev_day_periods().unwrap(), 100);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = "\
historic_path: data/historic.csv
output_dir: out
features:
  freq: 5min
  lag_list: [1, 2]
  rolling_windows: [12]
  ema_spans: [10]
loader:
  backend: sqlite
  database: ':memory:'
  table: features
";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.features.lag_list, vec![1, 2]);
        assert_eq!(config.features.ema_spans, vec![10]);
        assert_eq!(config.holiday_country, "CO");
        let loader = config.loader.unwrap();
        assert_eq!(loader.backend, LoaderBackend::Sqlite);
    }

    #[test]
    fn test_config_missing_required_key() {
        let yaml = "output_dir: out\n";
        assert!(serde_yaml::from_str::<PipelineConfig>(yaml).is_err());
    }

    #[test]
    fn test_config_from_path_missing_file() {
        let err = PipelineConfig::from_path(Path::new("does/not/exist.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
