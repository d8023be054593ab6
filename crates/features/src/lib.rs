//! Feature computation for the volumetria pipeline.
//!
//! This crate handles:
//! - Lag, difference and percent-change features
//! - Rolling statistics, rolling slope and EMA
//! - Calendar/cyclical encodings, jornada/quincena flags
//! - Colombian holiday calendar
//! - Historical aggregate families
//! - The columnar feature frame and its fill pass

pub mod builder;
pub mod calendar;
pub mod frame;
pub mod historical;
pub mod holidays;
pub mod rolling;
pub mod stats;

pub use builder::FeatureBuilder;
pub use frame::{FeatureColumn, FeatureFrame};
pub use holidays::HolidayCalendar;
pub use stats::{SummaryStats, METRIC_NAMES};
