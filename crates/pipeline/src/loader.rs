//! Downstream load collaborators.
//!
//! External code is responsible for pushing the feature table into a
//! warehouse; this module gives it a capability interface instead of a
//! driver probe: a `QueryExecutor` trait with two concrete
//! implementations, selected by configuration at startup. DDL is
//! generated from the output schema, and rows are inserted from the
//! written Parquet file.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;
use volumetria_core::{Error, LoaderBackend, LoaderConfig, Result};

/// Executes SQL statements against a configured backend.
pub trait QueryExecutor: std::fmt::Debug {
    /// Execute one SQL statement.
    fn execute(&self, sql: &str) -> Result<()>;
}

/// SQLite-backed executor.
#[derive(Debug)]
pub struct SqliteExecutor {
    conn: rusqlite::Connection,
}

impl SqliteExecutor {
    /// Open (or create) a database file; `:memory:` is accepted.
    pub fn open(database: &str) -> Result<Self> {
        let conn = if database == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(database)
        }
        .map_err(|e| Error::database(e.to_string()))?;
        Ok(Self { conn })
    }
}

impl QueryExecutor for SqliteExecutor {
    fn execute(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::database(e.to_string()))
    }
}

/// DuckDB-backed executor.
#[cfg(feature = "duckdb")]
#[derive(Debug)]
pub struct DuckDbExecutor {
    conn: duckdb::Connection,
}

#[cfg(feature = "duckdb")]
impl DuckDbExecutor {
    /// Open (or create) a database file; `:memory:` is accepted.
    pub fn open(database: &str) -> Result<Self> {
        let conn = if database == ":memory:" {
            duckdb::Connection::open_in_memory()
        } else {
            duckdb::Connection::open(database)
        }
        .map_err(|e| Error::database(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[cfg(feature = "duckdb")]
impl QueryExecutor for DuckDbExecutor {
    fn execute(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::database(e.to_string()))
    }
}

/// Build the executor selected by the loader configuration.
pub fn executor_from_config(config: &LoaderConfig) -> Result<Box<dyn QueryExecutor>> {
    match config.backend {
        LoaderBackend::Sqlite => Ok(Box::new(SqliteExecutor::open(&config.database)?)),
        #[cfg(feature = "duckdb")]
        LoaderBackend::Duckdb => Ok(Box::new(DuckDbExecutor::open(&config.database)?)),
        #[cfg(not(feature = "duckdb"))]
        LoaderBackend::Duckdb => Err(Error::config(
            "duckdb backend requested but the duckdb feature is not compiled in",
        )),
    }
}

/// SQL type for an Arrow column type.
fn sql_type(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Int64 => "BIGINT",
        DataType::Float64 => "DOUBLE",
        DataType::Boolean => "BOOLEAN",
        DataType::Timestamp(_, _) => "TIMESTAMP",
        _ => "STRING",
    }
}

/// `CREATE TABLE` statement for the given schema.
pub fn create_table_sql(table: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|field| format!("\"{}\" {}", field.name(), sql_type(field.data_type())))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n  {}\n)",
        columns.join(",\n  ")
    )
}

/// `INSERT` statement for one row of a record batch.
fn insert_row_sql(table: &str, batch: &RecordBatch, row: usize) -> Result<String> {
    let mut values = Vec::with_capacity(batch.num_columns());
    for (i, field) in batch.schema().fields().iter().enumerate() {
        values.push(format_value(batch.column(i).as_ref(), field.data_type(), row)?);
    }
    Ok(format!("INSERT INTO {table} VALUES ({})", values.join(", ")))
}

fn format_value(column: &dyn Array, data_type: &DataType, row: usize) -> Result<String> {
    if column.is_null(row) {
        return Ok("NULL".to_string());
    }
    match data_type {
        DataType::Float64 => {
            let array = downcast::<Float64Array>(column)?;
            Ok(format!("{}", array.value(row)))
        }
        DataType::Int64 => {
            let array = downcast::<Int64Array>(column)?;
            Ok(format!("{}", array.value(row)))
        }
        DataType::Utf8 => {
            let array = downcast::<StringArray>(column)?;
            // single quotes are stripped, not escaped
            Ok(format!("'{}'", array.value(row).replace('\'', "")))
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            let array = downcast::<TimestampMillisecondArray>(column)?;
            let ts = DateTime::from_timestamp_millis(array.value(row))
                .ok_or_else(|| Error::database("timestamp out of range"))?;
            Ok(format!("'{}'", ts.naive_utc().format("%Y-%m-%d %H:%M:%S")))
        }
        other => Err(Error::database(format!("unsupported column type {other:?}"))),
    }
}

fn downcast<T: 'static>(column: &dyn Array) -> Result<&T> {
    column
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::database("column type mismatch"))
}

/// Load a written Parquet feature table using the configured backend.
pub fn load_from_config(config: &LoaderConfig, parquet_path: &Path) -> Result<usize> {
    let executor = executor_from_config(config)?;
    load_parquet(executor.as_ref(), &config.table, parquet_path)
}

/// Load a written Parquet feature table into the configured backend.
///
/// Creates the target table from the Parquet schema, then inserts every
/// row. Returns the number of rows loaded.
pub fn load_parquet(
    executor: &dyn QueryExecutor,
    table: &str,
    parquet_path: &Path,
) -> Result<usize> {
    let file = File::open(parquet_path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::output(e.to_string()))?
        .build()
        .map_err(|e| Error::output(e.to_string()))?;

    let mut created = false;
    let mut rows = 0usize;
    for batch in reader {
        let batch = batch.map_err(|e| Error::output(e.to_string()))?;
        if !created {
            executor.execute(&create_table_sql(table, batch.schema().as_ref()))?;
            created = true;
        }
        for row in 0..batch.num_rows() {
            executor.execute(&insert_row_sql(table, &batch, row)?)?;
            rows += 1;
        }
    }
    info!(table, rows, "loaded feature table");
    Ok(rows)
}
