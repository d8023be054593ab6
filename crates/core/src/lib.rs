//! Core types and configuration for the volumetria pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Raw record and series types (resampled, filled, observed set)
//! - Configuration structures and YAML loading
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{FeatureConfig, LoaderBackend, LoaderConfig, PipelineConfig};
pub use error::{Error, Result};
pub use types::*;
