//! Factory Metrics common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the fm-* crates:
//! - Run identity
//! - Schema versioning for exported datasets
//! - Common error types
//! - Output and export format specifications

pub mod error;
pub mod id;
pub mod output;
pub mod schema;

pub use error::{Error, Result};
pub use id::RunId;
pub use output::{ExportFormat, OutputFormat};
pub use schema::SCHEMA_VERSION;
