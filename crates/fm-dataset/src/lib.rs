//! Factory Metrics dataset storage.
//!
//! This crate provides:
//! - Column schema definitions and the `Record` trait for typed rows
//! - Conversion of typed rows and summary tables into Arrow record batches
//! - Atomic CSV/Parquet writer and pretty-printing helpers

pub mod schema;
pub mod writer;

pub use schema::{
    arrow_schema, record_batch, Cell, ColumnData, ColumnDef, ColumnKind, Columns, Record,
};
pub use arrow::record_batch::RecordBatch;
pub use writer::{pretty, DatasetWriter, WriteError, WriteSummary, WriterConfig};

/// Timestamp layout used for exported timestamp columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default number of rows shown when previewing a table.
pub const DEFAULT_PREVIEW_ROWS: usize = 50;
