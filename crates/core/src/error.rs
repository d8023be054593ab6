//! Error types for the volumetria pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the volumetria pipeline.
///
/// Fatal variants abort the run; the recovered variants (`EmptySeries`,
/// `HolidayResolution`, `HistoricalAggregate`) are caught at their call
/// sites, logged, and never abort the batch.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing or malformed config). Fatal.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input file extension not recognized. Fatal.
    #[error("Unsupported input format: {0}")]
    UnsupportedInputFormat(String),

    /// Directory with no usable input files. Fatal.
    #[error("No input data: {0}")]
    NoInputData(String),

    /// A specific (entity, family) group has no data. The group is skipped.
    #[error("Empty series: {0}")]
    EmptySeries(String),

    /// Holiday calendar could not be resolved. The holiday feature
    /// degrades to 0 for the affected series.
    #[error("Holiday resolution error: {0}")]
    HolidayResolution(String),

    /// Grouping or alignment failure in a historical-aggregate family.
    /// The family degrades to undefined columns, zero-filled later.
    #[error("Historical aggregate error in {family}: {message}")]
    HistoricalAggregate { family: String, message: String },

    /// Invalid or inconsistent raw data.
    #[error("Data error: {0}")]
    Data(String),

    /// Spreadsheet read error.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Arrow/Parquet output error.
    #[error("Output error: {0}")]
    Output(String),

    /// Database error in a downstream load collaborator.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decode error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an unsupported-input-format error.
    pub fn unsupported_input_format(msg: impl Into<String>) -> Self {
        Error::UnsupportedInputFormat(msg.into())
    }

    /// Create a no-input-data error.
    pub fn no_input_data(msg: impl Into<String>) -> Self {
        Error::NoInputData(msg.into())
    }

    /// Create an empty-series error.
    pub fn empty_series(msg: impl Into<String>) -> Self {
        Error::EmptySeries(msg.into())
    }

    /// Create a holiday-resolution error.
    pub fn holiday_resolution(msg: impl Into<String>) -> Self {
        Error::HolidayResolution(msg.into())
    }

    /// Create a historical-aggregate error for a named family.
    pub fn historical_aggregate(family: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::HistoricalAggregate {
            family: family.into(),
            message: msg.into(),
        }
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a spreadsheet error.
    pub fn spreadsheet(msg: impl Into<String>) -> Self {
        Error::Spreadsheet(msg.into())
    }

    /// Create an output error.
    pub fn output(msg: impl Into<String>) -> Self {
        Error::Output(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }
}
