//! Pipeline orchestration and output for the volumetria pipeline.
//!
//! This crate handles:
//! - The `build_and_save_features` entry point for external schedulers
//! - Family-level aggregate alignment
//! - Parquet output and the YAML manifest
//! - The downstream-load collaborator interface (`QueryExecutor`)

pub mod loader;
pub mod orchestrator;
pub mod output;

pub use loader::{
    executor_from_config, load_from_config, load_parquet, QueryExecutor, SqliteExecutor,
};
pub use orchestrator::{build_and_save_features, run};
pub use output::{Manifest, OutputTable};

#[cfg(feature = "duckdb")]
pub use loader::DuckDbExecutor;
