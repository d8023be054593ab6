//! Calendar and cyclical encodings.
//!
//! Hour-of-day and day-of-week are encoded as sine/cosine pairs so the
//! wrap-around (23h -> 0h, Sunday -> Monday) stays contiguous for the
//! model. Jornada and quincena follow the business calendar of the call
//! centers: half-day shifts and semi-monthly payroll cycles.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDateTime, Timelike};

/// Sine/cosine pair for a cyclical value with the given period.
#[inline]
pub fn cyclical_pair(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// Day of week with Monday = 0.
#[inline]
pub fn day_of_week(ts: NaiveDateTime) -> u32 {
    ts.weekday().num_days_from_monday()
}

/// Weekend flag: Saturday or Sunday.
#[inline]
pub fn is_weekend(dow: u32) -> bool {
    dow >= 5
}

/// Half-day indicator: 0 until 12:00:00 inclusive, 1 afterwards.
///
/// Noon itself belongs to the morning; the next grid step after noon to
/// the afternoon.
#[inline]
pub fn jornada(ts: NaiveDateTime) -> f64 {
    let morning =
        ts.hour() < 12 || (ts.hour() == 12 && ts.minute() == 0 && ts.second() == 0);
    if morning {
        0.0
    } else {
        1.0
    }
}

/// Early payroll marker: day of month in 14..=16.
#[inline]
pub fn quincena_early(day_of_month: u32) -> f64 {
    if (14..=16).contains(&day_of_month) {
        1.0
    } else {
        0.0
    }
}

/// Late payroll marker: day of month >= 29, or 1 (the cycle spans the
/// month boundary).
#[inline]
pub fn quincena_late(day_of_month: u32) -> f64 {
    if day_of_month >= 29 || day_of_month == 1 {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_cyclical_pair_wraps() {
        let (sin0, cos0) = cyclical_pair(0.0, 24.0);
        assert_relative_eq!(sin0, 0.0);
        assert_relative_eq!(cos0, 1.0);
        let (sin12, cos12) = cyclical_pair(12.0, 24.0);
        assert_relative_eq!(sin12, 0.0, epsilon = 1e-12);
        assert_relative_eq!(cos12, -1.0);
    }

    #[test]
    fn test_day_of_week_monday_zero() {
        // 2025-03-03 is a Monday, 2025-03-09 a Sunday
        assert_eq!(day_of_week(dt("2025-03-03 00:00:00")), 0);
        assert_eq!(day_of_week(dt("2025-03-09 00:00:00")), 6);
        assert!(!is_weekend(4));
        assert!(is_weekend(5));
        assert!(is_weekend(6));
    }

    #[test]
    fn test_jornada_boundary() {
        assert_eq!(jornada(dt("2025-03-03 11:55:00")), 0.0);
        assert_eq!(jornada(dt("2025-03-03 12:00:00")), 0.0);
        assert_eq!(jornada(dt("2025-03-03 12:00:01")), 1.0);
        assert_eq!(jornada(dt("2025-03-03 12:05:00")), 1.0);
        assert_eq!(jornada(dt("2025-03-03 23:55:00")), 1.0);
        assert_eq!(jornada(dt("2025-03-03 00:00:00")), 0.0);
    }

    #[test]
    fn test_quincena_boundaries() {
        assert_eq!(quincena_early(13), 0.0);
        assert_eq!(quincena_early(14), 1.0);
        assert_eq!(quincena_early(15), 1.0);
        assert_eq!(quincena_early(16), 1.0);
        assert_eq!(quincena_early(17), 0.0);

        assert_eq!(quincena_late(28), 0.0);
        assert_eq!(quincena_late(29), 1.0);
        assert_eq!(quincena_late(30), 1.0);
        assert_eq!(quincena_late(31), 1.0);
        assert_eq!(quincena_late(1), 1.0);
        assert_eq!(quincena_late(2), 0.0);
    }
}
