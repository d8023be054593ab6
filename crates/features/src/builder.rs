//! Feature computation engine.
//!
//! Given one resampled-and-filled group series, produces the full feature
//! table over the series' grid: lags, differences, rolling statistics,
//! slopes, EMAs, same-period shifts, calendar encodings, holiday flag and
//! the historical aggregates, finalized with the forward-fill/zero-fill
//! pass so the output holds no missing values.

use chrono::{Datelike, Timelike};
use tracing::warn;
use volumetria_core::{FeatureConfig, GroupSeries, Result};

use crate::calendar;
use crate::frame::FeatureFrame;
use crate::historical;
use crate::holidays::HolidayCalendar;
use crate::rolling;

/// Builds the feature table for one group series.
pub struct FeatureBuilder<'a> {
    config: &'a FeatureConfig,
    holiday_country: &'a str,
}

impl<'a> FeatureBuilder<'a> {
    /// Create a builder over the given configuration.
    pub fn new(config: &'a FeatureConfig, holiday_country: &'a str) -> Self {
        Self {
            config,
            holiday_country,
        }
    }

    /// Build the feature frame for one group.
    ///
    /// Row count equals the series' grid length; column order is stable
    /// per run.
    pub fn build(&self, group: &GroupSeries) -> Result<FeatureFrame> {
        let values = group.filled.values();
        let mut frame = FeatureFrame::new(group.filled.timestamps().collect());

        // Lags
        for &k in &self.config.lag_list {
            frame.push_column(format!("lag_{k}"), rolling::lag(values, k));
        }

        // Differences and pct changes of the lagged columns
        for &k in &self.config.lag_list {
            let lagged = rolling::lag(values, k);
            frame.push_column(format!("diff_lag_{k}"), rolling::diff1(&lagged));
            frame.push_column(format!("pct_chg_lag_{k}"), rolling::pct_change1(&lagged));
        }

        // Rolling aggregations (window size in grid periods)
        for &w in &self.config.rolling_windows {
            let stats = rolling::rolling_stats(values, w);
            frame.push_column(format!("roll_sum_{w}"), stats.iter().map(|s| s.sum).collect());
            frame.push_column(format!("roll_mean_{w}"), stats.iter().map(|s| s.mean).collect());
            frame.push_column(
                format!("roll_median_{w}"),
                stats.iter().map(|s| s.median).collect(),
            );
            frame.push_column(format!("roll_min_{w}"), stats.iter().map(|s| s.min).collect());
            frame.push_column(format!("roll_max_{w}"), stats.iter().map(|s| s.max).collect());
            frame.push_column(format!("roll_std_{w}"), stats.iter().map(|s| s.std).collect());
            frame.push_column(format!("roll_q25_{w}"), stats.iter().map(|s| s.q25).collect());
            frame.push_column(format!("roll_q75_{w}"), stats.iter().map(|s| s.q75).collect());
            frame.push_column(format!("roll_slope_{w}"), rolling::rolling_slope(values, w));
        }

        // EMA features
        for &span in &self.config.ema_spans {
            frame.push_column(format!("ema_{span}"), rolling::ema(values, span));
        }

        // Same-period shifts derived from the grid frequency
        let prev_day = self.config.prev_day_periods()?;
        frame.push_column("prev_day", rolling::lag(values, prev_day));
        frame.push_column("prev_week", rolling::lag(values, prev_day * 7));

        // Calendar features
        let index = frame.index().to_vec();
        let hours: Vec<f64> = index.iter().map(|ts| ts.hour() as f64).collect();
        let dows: Vec<f64> = index
            .iter()
            .map(|ts| calendar::day_of_week(*ts) as f64)
            .collect();
        frame.push_column("hour", hours.clone());
        frame.push_column("dow", dows.clone());
        let (hour_sin, hour_cos): (Vec<f64>, Vec<f64>) = hours
            .iter()
            .map(|h| calendar::cyclical_pair(*h, 24.0))
            .unzip();
        frame.push_column("hour_sin", hour_sin);
        frame.push_column("hour_cos", hour_cos);
        let (dow_sin, dow_cos): (Vec<f64>, Vec<f64>) = dows
            .iter()
            .map(|d| calendar::cyclical_pair(*d, 7.0))
            .unzip();
        frame.push_column("dow_sin", dow_sin);
        frame.push_column("dow_cos", dow_cos);
        frame.push_column(
            "is_weekend",
            dows.iter()
                .map(|d| if calendar::is_weekend(*d as u32) { 1.0 } else { 0.0 })
                .collect(),
        );
        frame.push_column("month", index.iter().map(|ts| ts.month() as f64).collect());
        frame.push_column(
            "day_of_month",
            index.iter().map(|ts| ts.day() as f64).collect(),
        );
        frame.push_column(
            "day_of_year",
            index.iter().map(|ts| ts.ordinal() as f64).collect(),
        );

        // Jornada and quincena flags
        frame.push_column("jornada", index.iter().map(|ts| calendar::jornada(*ts)).collect());
        frame.push_column(
            "quincena_early",
            index.iter().map(|ts| calendar::quincena_early(ts.day())).collect(),
        );
        frame.push_column(
            "quincena_late",
            index.iter().map(|ts| calendar::quincena_late(ts.day())).collect(),
        );

        // Holiday flag across all years spanned by the series; fail-open
        frame.push_column("holiday", self.holiday_flags(&index));

        // Target value
        frame.push_column("llamados", values.to_vec());

        // Historical aggregates over the pre-fill values
        historical::append_historical_features(&mut frame, &group.resampled);

        // Forward fill, then fill remaining gaps with 0
        frame.fill_forward_then_zero();
        Ok(frame)
    }

    fn holiday_flags(&self, index: &[chrono::NaiveDateTime]) -> Vec<f64> {
        let years = match (index.first(), index.last()) {
            (Some(first), Some(last)) => first.year()..=last.year(),
            _ => return Vec::new(),
        };
        match HolidayCalendar::for_country(self.holiday_country, years) {
            Ok(calendar) => index
                .iter()
                .map(|ts| if calendar.contains(ts.date()) { 1.0 } else { 0.0 })
                .collect(),
            Err(e) => {
                warn!(country = self.holiday_country, error = %e, "holiday feature defaults to 0");
                vec![0.0; index.len()]
            }
        }
    }
}
