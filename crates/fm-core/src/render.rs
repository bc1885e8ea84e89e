//! Renderer sinks for built charts.

use std::io::Write;

use fm_common::{Error, Result};
use fm_dataset::{pretty, RecordBatch};

use crate::chart::Chart;

/// Receives charts in catalogue order.
pub trait Renderer {
    /// Leading rows of a raw table, shown before its charts.
    fn preview(&mut self, _title: &str, _rows: &RecordBatch) -> Result<()> {
        Ok(())
    }

    fn render(&mut self, chart: &Chart) -> Result<()>;

    /// Called once after the last chart.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discards every chart.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _chart: &Chart) -> Result<()> {
        Ok(())
    }
}

/// Prints each chart as a titled table.
pub struct TextRenderer<W: Write> {
    out: W,
    preview: Option<usize>,
    rendered: usize,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            preview: Some(fm_dataset::DEFAULT_PREVIEW_ROWS),
            rendered: 0,
        }
    }

    /// Limit each table to `rows` rows; `None` prints everything.
    pub fn with_preview(mut self, rows: Option<usize>) -> Self {
        self.preview = rows;
        self
    }

    pub fn rendered(&self) -> usize {
        self.rendered
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn preview(&mut self, title: &str, rows: &RecordBatch) -> Result<()> {
        let table = pretty(rows, None).map_err(|e| Error::Render(e.to_string()))?;
        writeln!(self.out, "== {title}: first {} rows ==", rows.num_rows())?;
        writeln!(self.out, "{table}")?;
        writeln!(self.out)?;
        Ok(())
    }

    fn render(&mut self, chart: &Chart) -> Result<()> {
        let batch = chart
            .data
            .to_columns()?
            .to_record_batch()
            .map_err(|e| Error::Render(e.to_string()))?;
        let table = pretty(&batch, self.preview).map_err(|e| Error::Render(e.to_string()))?;

        let spec = &chart.spec;
        writeln!(self.out, "== {} ({}) ==", spec.title, spec.kind)?;
        if let (Some(x), Some(y)) = (&spec.x_label, &spec.y_label) {
            writeln!(self.out, "x: {x}  y: {y}")?;
        }
        writeln!(self.out, "{table}")?;
        if let Some(limit) = self.preview {
            let total = batch.num_rows();
            if total > limit {
                writeln!(self.out, "({} of {} rows shown)", limit, total)?;
            }
        }
        writeln!(self.out)?;
        self.rendered += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
