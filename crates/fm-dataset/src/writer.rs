//! Atomic dataset writer.
//!
//! A dataset is written to a temporary file next to the destination and
//! renamed into place only after every byte was written, so a failed export
//! never leaves a truncated file behind.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use arrow::csv::WriterBuilder;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use fm_common::ExportFormat;

use crate::TIMESTAMP_FORMAT;

/// Errors from dataset writes.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("failed to move finished file into {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<WriteError> for fm_common::Error {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Io(e) => fm_common::Error::Io(e),
            other => fm_common::Error::Export(other.to_string()),
        }
    }
}

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub format: ExportFormat,

    /// Write a header row (CSV only).
    pub header: bool,

    /// strftime layout for timestamp columns (CSV only).
    pub timestamp_format: String,
}

impl WriterConfig {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            header: true,
            timestamp_format: TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self::new(ExportFormat::Csv)
    }
}

/// What a completed write produced.
#[derive(Debug, Clone, Serialize)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub rows: usize,
    pub bytes: u64,
}

/// Writes record batches to CSV or Parquet files.
#[derive(Debug, Clone, Default)]
pub struct DatasetWriter {
    config: WriterConfig,
}

impl DatasetWriter {
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Write `batch` to `path`, replacing any existing file.
    pub fn write(&self, batch: &RecordBatch, path: &Path) -> Result<WriteSummary, WriteError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        debug!(
            tmp = %tmp.path().display(),
            format = %self.config.format,
            rows = batch.num_rows(),
            "writing dataset"
        );

        match self.config.format {
            ExportFormat::Csv => self.write_csv(batch, tmp.as_file_mut())?,
            ExportFormat::Parquet => write_parquet(batch, tmp.as_file_mut())?,
        }
        tmp.as_file_mut().flush()?;
        tmp.as_file().sync_all()?;

        let file = tmp.persist(path).map_err(|e| WriteError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        let bytes = file.metadata()?.len();

        info!(
            path = %path.display(),
            format = %self.config.format,
            rows = batch.num_rows(),
            bytes,
            "dataset written"
        );

        Ok(WriteSummary {
            path: path.to_path_buf(),
            format: self.config.format,
            rows: batch.num_rows(),
            bytes,
        })
    }

    fn write_csv(&self, batch: &RecordBatch, file: &mut File) -> Result<(), WriteError> {
        let mut writer = WriterBuilder::new()
            .with_header(self.config.header)
            .with_timestamp_format(self.config.timestamp_format.clone())
            .build(file);
        writer.write(batch)?;
        Ok(())
    }
}

fn write_parquet(batch: &RecordBatch, file: &mut File) -> Result<(), WriteError> {
    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Render the first `limit` rows of a batch as an ASCII table.
pub fn pretty(batch: &RecordBatch, limit: Option<usize>) -> Result<String, ArrowError> {
    let shown = match limit {
        Some(n) if n < batch.num_rows() => batch.slice(0, n),
        _ => batch.clone(),
    };
    Ok(pretty_format_batches(&[shown])?.to_string())
}
