//! Columnar feature container.
//!
//! A `FeatureFrame` holds one row per grid timestamp and named f64
//! columns in insertion order. NaN marks a not-yet-defined cell until the
//! finalization pass forward-fills and then zero-fills every column.

use chrono::NaiveDateTime;

/// One named feature column.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// A feature table indexed by the series' grid.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    index: Vec<NaiveDateTime>,
    columns: Vec<FeatureColumn>,
}

impl FeatureFrame {
    /// Create an empty frame over the given grid index.
    pub fn new(index: Vec<NaiveDateTime>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Grid timestamps, one per row.
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    /// Columns in insertion order.
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Append a column. The value count must equal the row count.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.index.len());
        self.columns.push(FeatureColumn {
            name: name.into(),
            values,
        });
    }

    /// Values of a named column, if present.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Forward-fill every column, then replace remaining NaN with 0.
    ///
    /// Residual gaps come from window warm-up and missing aggregate
    /// lookups; after this pass the frame holds no missing values.
    pub fn fill_forward_then_zero(&mut self) {
        for column in &mut self.columns {
            let mut last = f64::NAN;
            for value in &mut column.values {
                if value.is_nan() {
                    *value = last;
                } else {
                    last = *value;
                }
            }
            for value in &mut column.values {
                if value.is_nan() {
                    *value = 0.0;
                }
            }
        }
    }
}
