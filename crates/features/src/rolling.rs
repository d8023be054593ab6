//! Trailing-window transforms over a filled series.
//!
//! All windows are as-of aggregates: the window ending at t includes t
//! itself. Statistics use a minimum of one period, so early windows are
//! valid but noisy; the slope needs two.

use crate::stats::{self, SummaryStats};

/// Value `periods` steps back; NaN before the series start.
pub fn lag(values: &[f64], periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| {
            if t >= periods {
                values[t - periods]
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// First difference of a column, NaN-propagating.
pub fn diff1(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|t| if t >= 1 { values[t] - values[t - 1] } else { f64::NAN })
        .collect()
}

/// One-period percent change of a column.
///
/// Non-finite results (missing or zero denominator) become 0 immediately.
pub fn pct_change1(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|t| {
            if t >= 1 {
                let change = (values[t] - values[t - 1]) / values[t - 1];
                if change.is_finite() {
                    change
                } else {
                    0.0
                }
            } else {
                0.0
            }
        })
        .collect()
}

/// Trailing-window summary statistics, window ending at t inclusive.
pub fn rolling_stats(values: &[f64], window: usize) -> Vec<SummaryStats> {
    (0..values.len())
        .map(|t| {
            let begin = (t + 1).saturating_sub(window);
            stats::summarize(&values[begin..=t])
        })
        .collect()
}

/// Trailing-window mean, minimum one period.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| {
            let begin = (t + 1).saturating_sub(window);
            let slice = &values[begin..=t];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Least-squares slope of each trailing window against its 0..len-1 index.
///
/// Windows with fewer than 2 points or a degenerate fit yield 0.
pub fn rolling_slope(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| {
            let begin = (t + 1).saturating_sub(window);
            window_slope(&values[begin..=t])
        })
        .collect()
}

fn window_slope(window: &[f64]) -> f64 {
    let n = window.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = window.iter().sum::<f64>() / n_f;
    let mut cov = 0.0;
    let mut var = 0.0;
    for (i, &y) in window.iter().enumerate() {
        let dx = i as f64 - x_mean;
        cov += dx * (y - y_mean);
        var += dx * dx;
    }
    if var > 0.0 {
        let slope = cov / var;
        if slope.is_finite() {
            slope
        } else {
            0.0
        }
    } else {
        0.0
    }
}

/// Exponentially weighted moving average.
///
/// alpha = 2 / (span + 1), no bias adjustment, seeded with the first value.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut current = f64::NAN;
    for (i, &v) in values.iter().enumerate() {
        if i == 0 {
            current = v;
        } else {
            current = alpha * v + (1.0 - alpha) * current;
        }
        out.push(current);
    }
    out
}
