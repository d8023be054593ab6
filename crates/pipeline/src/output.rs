//! Feature table output: Parquet file and YAML manifest.
//!
//! Per-group frames are concatenated as a column union (absent columns
//! null-filled) in deterministic group order. Columns follow the layout
//! of the feature frame, bracketed by the identifier columns:
//! `fecha_hora`, features, `api_name`, `familia`, `imputed_flag`,
//! family-level features.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float64Builder, Int64Builder, StringBuilder, TimestampMillisecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use volumetria_core::{Error, Result};
use volumetria_features::{FeatureColumn, FeatureFrame};

/// Rows of one processed group.
struct GroupRows {
    api_name: String,
    familia: String,
    index: Vec<NaiveDateTime>,
    imputed: Vec<i64>,
    features: Vec<FeatureColumn>,
    family_features: Vec<FeatureColumn>,
}

/// Concatenation buffer for the final feature table.
#[derive(Default)]
pub struct OutputTable {
    groups: Vec<GroupRows>,
    feature_columns: Vec<String>,
    family_columns: Vec<String>,
}

impl OutputTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one group's frame, identifiers and family features.
    ///
    /// Column unions grow in first-seen order, keeping the output layout
    /// deterministic for a given group order.
    pub fn append_group(
        &mut self,
        api_name: &str,
        familia: &str,
        frame: FeatureFrame,
        imputed: Vec<i64>,
        family_features: Vec<FeatureColumn>,
    ) {
        for column in frame.columns() {
            if !self.feature_columns.contains(&column.name) {
                self.feature_columns.push(column.name.clone());
            }
        }
        for column in &family_features {
            if !self.family_columns.contains(&column.name) {
                self.family_columns.push(column.name.clone());
            }
        }
        self.groups.push(GroupRows {
            api_name: api_name.to_string(),
            familia: familia.to_string(),
            index: frame.index().to_vec(),
            imputed,
            features: frame.columns().to_vec(),
            family_features,
        });
    }

    /// Total row count.
    pub fn num_rows(&self) -> usize {
        self.groups.iter().map(|g| g.index.len()).sum()
    }

    /// Number of appended groups.
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Total column count, identifiers included.
    pub fn num_columns(&self) -> usize {
        // fecha_hora + features + api_name + familia + imputed_flag + family
        1 + self.feature_columns.len() + 3 + self.family_columns.len()
    }

    fn schema(&self) -> Schema {
        let mut fields = vec![Field::new(
            "fecha_hora",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        )];
        for name in &self.feature_columns {
            fields.push(Field::new(name, DataType::Float64, true));
        }
        fields.push(Field::new("api_name", DataType::Utf8, false));
        fields.push(Field::new("familia", DataType::Utf8, false));
        fields.push(Field::new("imputed_flag", DataType::Int64, false));
        for name in &self.family_columns {
            fields.push(Field::new(name, DataType::Float64, true));
        }
        Schema::new(fields)
    }

    fn build_record_batch(&self, schema: Arc<Schema>) -> Result<RecordBatch> {
        let num_rows = self.num_rows();
        let mut ts_builder = TimestampMillisecondBuilder::with_capacity(num_rows);
        let mut api_builder = StringBuilder::with_capacity(num_rows, num_rows * 16);
        let mut familia_builder = StringBuilder::with_capacity(num_rows, num_rows * 16);
        let mut imputed_builder = Int64Builder::with_capacity(num_rows);
        let mut feature_builders: Vec<Float64Builder> = self
            .feature_columns
            .iter()
            .map(|_| Float64Builder::with_capacity(num_rows))
            .collect();
        let mut family_builders: Vec<Float64Builder> = self
            .family_columns
            .iter()
            .map(|_| Float64Builder::with_capacity(num_rows))
            .collect();

        for group in &self.groups {
            let features: HashMap<&str, &[f64]> = group
                .features
                .iter()
                .map(|c| (c.name.as_str(), c.values.as_slice()))
                .collect();
            let family: HashMap<&str, &[f64]> = group
                .family_features
                .iter()
                .map(|c| (c.name.as_str(), c.values.as_slice()))
                .collect();

            for (row, ts) in group.index.iter().enumerate() {
                ts_builder.append_value(ts.and_utc().timestamp_millis());
                for (i, name) in self.feature_columns.iter().enumerate() {
                    match features.get(name.as_str()) {
                        Some(values) => feature_builders[i].append_value(values[row]),
                        None => feature_builders[i].append_null(),
                    }
                }
                api_builder.append_value(&group.api_name);
                familia_builder.append_value(&group.familia);
                imputed_builder.append_value(group.imputed[row]);
                for (i, name) in self.family_columns.iter().enumerate() {
                    match family.get(name.as_str()) {
                        Some(values) => family_builders[i].append_value(values[row]),
                        None => family_builders[i].append_null(),
                    }
                }
            }
        }

        let mut columns: Vec<ArrayRef> = vec![Arc::new(ts_builder.finish())];
        for mut builder in feature_builders {
            columns.push(Arc::new(builder.finish()));
        }
        columns.push(Arc::new(api_builder.finish()));
        columns.push(Arc::new(familia_builder.finish()));
        columns.push(Arc::new(imputed_builder.finish()));
        for mut builder in family_builders {
            columns.push(Arc::new(builder.finish()));
        }

        RecordBatch::try_new(schema, columns).map_err(|e| Error::output(e.to_string()))
    }
}

/// Write the table as a SNAPPY-compressed Parquet file.
///
/// Returns the (rows, cols) shape for the manifest.
pub fn write_parquet(table: &OutputTable, path: &Path) -> Result<(usize, usize)> {
    let schema = Arc::new(table.schema());
    let batch = table.build_record_batch(schema.clone())?;

    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))
        .map_err(|e| Error::output(e.to_string()))?;
    writer
        .write(&batch)
        .map_err(|e| Error::output(e.to_string()))?;
    writer.close().map_err(|e| Error::output(e.to_string()))?;

    Ok((table.num_rows(), table.num_columns()))
}

/// Shape and location of a written feature table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub rows: usize,
    pub cols: usize,
    pub path: String,
}

/// Write the manifest as a YAML document.
pub fn write_manifest(manifest: &Manifest, path: &Path) -> Result<()> {
    let text = serde_yaml::to_string(manifest)?;
    std::fs::write(path, text)?;
    Ok(())
}
