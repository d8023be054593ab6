//! Public-holiday calendars.
//!
//! Colombian holidays are the union of fixed dates, the Emiliani-law
//! movable dates (observed the following Monday unless they already fall
//! on one), and the Easter-derived dates. Easter Sunday comes from the
//! Gregorian computus.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use chrono::{Datelike, Duration, NaiveDate};
use volumetria_core::{Error, Result};

/// Set of holiday dates across a span of years.
#[derive(Debug, Clone)]
pub struct HolidayCalendar {
    dates: HashSet<NaiveDate>,
}

impl HolidayCalendar {
    /// Build the calendar for a country code over the given years.
    ///
    /// Only `"CO"` (Colombia) is implemented; other codes fail with a
    /// `HolidayResolution` error, which callers treat as fail-open.
    pub fn for_country(code: &str, years: RangeInclusive<i32>) -> Result<Self> {
        match code.to_ascii_uppercase().as_str() {
            "CO" => Self::colombia(years),
            other => Err(Error::holiday_resolution(format!(
                "no holiday calendar for country {other:?}"
            ))),
        }
    }

    /// Colombian public holidays for the given years.
    pub fn colombia(years: RangeInclusive<i32>) -> Result<Self> {
        let mut dates = HashSet::new();
        for year in years {
            // Fixed dates
            for (month, day) in [(1, 1), (5, 1), (7, 20), (8, 7), (12, 8), (12, 25)] {
                dates.insert(ymd(year, month, day)?);
            }
            // Emiliani-law dates, observed the following Monday
            for (month, day) in [
                (1, 6),   // Reyes Magos
                (3, 19),  // San José
                (6, 29),  // San Pedro y San Pablo
                (8, 15),  // Asunción
                (10, 12), // Día de la Raza
                (11, 1),  // Todos los Santos
                (11, 11), // Independencia de Cartagena
            ] {
                dates.insert(next_monday_inclusive(ymd(year, month, day)?));
            }
            // Easter-derived dates
            let easter = easter_sunday(year)?;
            dates.insert(easter - Duration::days(3)); // Jueves Santo
            dates.insert(easter - Duration::days(2)); // Viernes Santo
            dates.insert(easter + Duration::days(43)); // Ascensión (shifted Monday)
            dates.insert(easter + Duration::days(64)); // Corpus Christi (shifted Monday)
            dates.insert(easter + Duration::days(71)); // Sagrado Corazón (shifted Monday)
        }
        Ok(Self { dates })
    }

    /// Whether the given date is a holiday.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    /// Number of holiday dates in the calendar.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the calendar holds no dates.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::holiday_resolution(format!("invalid date {year}-{month}-{day}")))
}

/// The date itself when it falls on a Monday, otherwise the next Monday.
fn next_monday_inclusive(date: NaiveDate) -> NaiveDate {
    let offset = (7 - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(offset as i64)
}

/// Easter Sunday for the given year (Gregorian computus).
fn easter_sunday(year: i32) -> Result<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, month as u32, day as u32)
}
