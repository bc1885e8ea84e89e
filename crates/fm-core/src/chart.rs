//! Chart specifications and the data handed to a renderer.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use fm_common::{Error, Result};
use fm_dataset::{Cell, ColumnData, ColumnKind, Columns, Record};

use crate::aggregate::{
    pivot, resolve_key, resolve_numeric, type_error, value_counts, value_counts_columns,
    Aggregation, GroupBy, GroupKey, PivotTable, Predicate, ResolvedPredicate, SummaryTable,
    ValueCount,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    GroupedBar,
    Heatmap,
    Pie,
    Line,
    Scatter,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChartKind::Bar => "bar",
            ChartKind::GroupedBar => "grouped bar",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Pie => "pie",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
        };
        f.write_str(s)
    }
}

/// Reduction applied to the value axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartReduction {
    #[default]
    Mean,
    Sum,
    Count,
}

/// What to draw and from which columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x: GroupKey,
    pub y: Option<String>,
    pub hue: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub reduction: ChartReduction,
    pub filter: Option<Predicate>,
    pub decimals: Option<u32>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, title: impl Into<String>, x: GroupKey) -> Self {
        Self {
            kind,
            title: title.into(),
            x,
            y: None,
            hue: None,
            x_label: None,
            y_label: None,
            reduction: ChartReduction::default(),
            filter: None,
            decimals: None,
        }
    }

    pub fn y(mut self, column: &str) -> Self {
        self.y = Some(column.to_string());
        self
    }

    pub fn hue(mut self, column: &str) -> Self {
        self.hue = Some(column.to_string());
        self
    }

    pub fn labels(mut self, x: &str, y: &str) -> Self {
        self.x_label = Some(x.to_string());
        self.y_label = Some(y.to_string());
        self
    }

    pub fn reduce(mut self, reduction: ChartReduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    pub fn round(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    fn value_column(&self) -> Result<&str> {
        self.y.as_deref().ok_or_else(|| {
            Error::Aggregation(format!("chart '{}' has no value axis", self.title))
        })
    }

    fn hue_column(&self) -> Result<&str> {
        self.hue.as_deref().ok_or_else(|| {
            Error::Aggregation(format!("chart '{}' has no hue column", self.title))
        })
    }

    fn needs_value(&self) -> bool {
        match self.kind {
            ChartKind::Pie => false,
            ChartKind::Scatter => true,
            _ => self.reduction != ChartReduction::Count,
        }
    }

    /// Check every referenced column against the schema of `R`.
    ///
    /// Grouping axes must be discrete (text, int, or a timestamp date),
    /// value axes numeric.
    pub fn validate_against<R: Record>(&self) -> Result<()> {
        match self.kind {
            ChartKind::Scatter => {
                let GroupKey::Column(x) = &self.x else {
                    return Err(Error::Aggregation(format!(
                        "chart '{}' needs a plain column on the x axis",
                        self.title
                    )));
                };
                resolve_numeric::<R>(x)?;
            }
            ChartKind::Pie => {
                let key = resolve_key::<R>(&self.x)?;
                if key.kind != ColumnKind::Text {
                    return Err(type_error(self.x.name(), "text", key.kind));
                }
            }
            _ => {
                resolve_key::<R>(&self.x)?;
            }
        }
        if self.needs_value() {
            resolve_numeric::<R>(self.value_column()?)?;
        }
        if matches!(self.kind, ChartKind::GroupedBar | ChartKind::Heatmap) {
            self.hue_column()?;
        }
        if let Some(hue) = &self.hue {
            resolve_key::<R>(&GroupKey::column(hue.as_str()))?;
        }
        if let Some(p) = &self.filter {
            ResolvedPredicate::resolve::<R>(p)?;
        }
        Ok(())
    }

    fn aggregation(&self) -> Result<Aggregation> {
        Ok(match self.reduction {
            ChartReduction::Mean => Aggregation::mean(self.value_column()?),
            ChartReduction::Sum => Aggregation::sum(self.value_column()?),
            ChartReduction::Count => Aggregation::count("count"),
        })
    }

    fn group_by(&self, with_hue: bool) -> Result<GroupBy> {
        let mut query = GroupBy::new().group(self.x.clone());
        if with_hue {
            query = query.key(self.hue_column()?);
        }
        query = query.agg(self.aggregation()?);
        if let Some(p) = &self.filter {
            query = query.filter(p.clone());
        }
        if let Some(d) = self.decimals {
            query = query.round(d);
        }
        Ok(query)
    }
}

/// One point of a scatter chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub hue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSeries {
    pub x_column: String,
    pub y_column: String,
    pub hue_column: Option<String>,
    pub points: Vec<Point>,
}

/// Raw (x, y[, hue]) points, one per row.
pub fn scatter_points<R: Record>(
    rows: &[R],
    x: &str,
    y: &str,
    hue: Option<&str>,
) -> Result<PointSeries> {
    let xi = resolve_numeric::<R>(x)?;
    let yi = resolve_numeric::<R>(y)?;
    let hi = hue.map(R::column_index).transpose()?;
    let points = rows
        .iter()
        .filter_map(|row| {
            let hue = hi.map(|i| match row.cell(i) {
                Cell::Text(t) => t.to_string(),
                Cell::Int(v) => v.to_string(),
                Cell::Float(v) => v.to_string(),
                Cell::Timestamp(t) => t.to_string(),
            });
            Some(Point {
                x: row.cell(xi).as_f64()?,
                y: row.cell(yi).as_f64()?,
                hue,
            })
        })
        .collect();
    Ok(PointSeries {
        x_column: x.to_string(),
        y_column: y.to_string(),
        hue_column: hue.map(str::to_string),
        points,
    })
}

/// Data behind one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ChartData {
    Summary(SummaryTable),
    Pivot(PivotTable),
    Counts { column: String, counts: Vec<ValueCount> },
    Points(PointSeries),
}

impl ChartData {
    /// Number of rows a renderer would draw.
    pub fn len(&self) -> usize {
        match self {
            ChartData::Summary(t) => t.len(),
            ChartData::Pivot(p) => p.index.len(),
            ChartData::Counts { counts, .. } => counts.len(),
            ChartData::Points(s) => s.points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_columns(&self) -> Result<Columns> {
        match self {
            ChartData::Summary(t) => t.to_columns(),
            ChartData::Pivot(p) => p.to_columns(),
            ChartData::Counts { column, counts } => value_counts_columns(column, counts),
            ChartData::Points(s) => {
                let mut out = Columns::new();
                out.push(
                    s.x_column.as_str(),
                    ColumnData::Float(s.points.iter().map(|p| p.x).collect()),
                )?;
                out.push(
                    s.y_column.as_str(),
                    ColumnData::Float(s.points.iter().map(|p| p.y).collect()),
                )?;
                if let Some(hue) = &s.hue_column {
                    out.push(
                        hue.as_str(),
                        ColumnData::Text(
                            s.points
                                .iter()
                                .map(|p| p.hue.clone().unwrap_or_default())
                                .collect(),
                        ),
                    )?;
                }
                Ok(out)
            }
        }
    }
}

/// A validated spec with its computed data.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub spec: ChartSpec,
    pub data: ChartData,
}

impl Chart {
    /// Validate `spec` against `R` and compute its data from `rows`.
    pub fn build<R: Record>(spec: ChartSpec, rows: &[R]) -> Result<Self> {
        spec.validate_against::<R>()?;
        let data = match spec.kind {
            ChartKind::Bar => ChartData::Summary(spec.group_by(false)?.run(rows)?),
            ChartKind::GroupedBar => ChartData::Summary(spec.group_by(true)?.run(rows)?),
            ChartKind::Heatmap => ChartData::Pivot(pivot_for(&spec, rows)?),
            ChartKind::Line if spec.hue.is_some() => ChartData::Pivot(pivot_for(&spec, rows)?),
            ChartKind::Line => ChartData::Summary(spec.group_by(false)?.run(rows)?),
            ChartKind::Pie => {
                let column = spec.x.name().to_string();
                let counts = value_counts(rows, &column)?;
                ChartData::Counts { column, counts }
            }
            ChartKind::Scatter => ChartData::Points(scatter_points(
                rows,
                spec.x.name(),
                spec.value_column()?,
                spec.hue.as_deref(),
            )?),
        };
        debug!(title = %spec.title, kind = %spec.kind, rows = data.len(), "built chart");
        Ok(Self { spec, data })
    }

    pub fn title(&self) -> &str {
        &self.spec.title
    }
}

fn pivot_for<R: Record>(spec: &ChartSpec, rows: &[R]) -> Result<PivotTable> {
    if spec.filter.is_some() {
        return Err(Error::Aggregation(format!(
            "chart '{}': filters are not supported on pivoted data",
            spec.title
        )));
    }
    pivot(
        rows,
        spec.x.clone(),
        GroupKey::column(spec.hue_column()?),
        spec.aggregation()?,
        spec.decimals,
    )
}
