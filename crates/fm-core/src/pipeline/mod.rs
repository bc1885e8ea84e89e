//! End-to-end pipeline runs.
//!
//! Both pipelines run the same linear flow: generate, derive or inject,
//! build every chart, export the raw table, then hand the charts to the
//! renderer. A failing chart spec aborts the run before any file is
//! written.

pub mod shifts;
pub mod utility;

pub use shifts::{run_shifts, shift_charts};
pub use utility::{daily_summary, daily_summary_columns, run_utility, utility_charts, DailySummary};

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use fm_common::{ExportFormat, Result, RunId, SCHEMA_VERSION};
use fm_config::ConfigSnapshot;
use fm_dataset::{record_batch, DatasetWriter, Record, WriteSummary, WriterConfig};

use crate::chart::Chart;
use crate::inject::InjectionReport;
use crate::render::Renderer;
use crate::rng::resolve_seed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Shifts,
    Utility,
}

/// Seed a run used, and whether it was chosen at random.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedInfo {
    pub value: u64,
    pub generated: bool,
}

impl SeedInfo {
    pub fn resolve(configured: Option<u64>) -> Self {
        Self {
            value: resolve_seed(configured),
            generated: configured.is_none(),
        }
    }
}

/// Per-run options that are not part of the dataset config.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Rows of the raw table handed to the renderer as a preview.
    pub preview_rows: Option<usize>,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub schema_version: String,
    pub run_id: RunId,
    pub pipeline: PipelineKind,
    pub seed: SeedInfo,
    pub config: ConfigSnapshot,
    pub rows: usize,
    pub export: WriteSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injection: Option<InjectionReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub daily_summary: Vec<DailySummary>,
    pub charts: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Shared bookkeeping for a run in progress.
pub(crate) struct RunContext {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    clock: Instant,
}

impl RunContext {
    pub fn start(kind: PipelineKind, seed: &SeedInfo, snapshot: &ConfigSnapshot) -> Self {
        let run_id = RunId::new();
        info!(
            run_id = %run_id,
            pipeline = ?kind,
            seed = seed.value,
            seed_generated = seed.generated,
            config = snapshot.short_hash(),
            "starting pipeline run"
        );
        Self {
            run_id,
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock.elapsed().as_millis() as u64
    }
}

/// Write typed rows to `path` in declaration order.
pub fn export_records<R: Record>(
    rows: &[R],
    path: &Path,
    format: ExportFormat,
) -> Result<WriteSummary> {
    let batch = record_batch(rows)?;
    let summary = DatasetWriter::new(WriterConfig::new(format)).write(&batch, path)?;
    info!(
        path = %summary.path.display(),
        format = ?summary.format,
        rows = summary.rows,
        bytes = summary.bytes,
        "exported table"
    );
    Ok(summary)
}

/// Export path with the extension matching `format` when the configured
/// path uses the other format's extension.
pub fn export_path(path: &Path, format: ExportFormat) -> PathBuf {
    let other = match format {
        ExportFormat::Csv => ExportFormat::Parquet,
        ExportFormat::Parquet => ExportFormat::Csv,
    };
    let mismatched = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(other.extension()));
    if mismatched {
        path.with_extension(format.extension())
    } else {
        path.to_path_buf()
    }
}

/// Preview the raw table, then render every chart in order.
pub(crate) fn render_all<R: Record>(
    renderer: &mut dyn Renderer,
    title: &str,
    rows: &[R],
    charts: &[Chart],
    options: &RunOptions,
) -> Result<()> {
    if let Some(n) = options.preview_rows {
        let shown = &rows[..n.min(rows.len())];
        renderer.preview(title, &record_batch(shown)?)?;
    }
    for chart in charts {
        renderer.render(chart)?;
    }
    renderer.finish()
}

pub(crate) fn schema_version() -> String {
    SCHEMA_VERSION.to_string()
}
