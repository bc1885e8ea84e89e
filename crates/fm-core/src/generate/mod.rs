//! Synthetic table generation.
//!
//! Generation is driven by a [`DrawPlan`]: an ordered list of column draws
//! executed column-major against a caller-owned RNG. All `rows` values of
//! the first column are drawn, then all values of the second, and so on.
//! The plan order is part of the output contract: the same seed with a
//! reordered plan yields a different table.

pub mod shifts;
pub mod utility;

pub use shifts::{generate_shifts, shift_draw_plan, ShiftRecord};
pub use utility::{generate_utility, hourly_timestamps, utility_draw_plan, Shift, UtilityRecord};

use rand::distr::{Distribution, Uniform};
use rand::Rng;
use tracing::debug;

use fm_common::{Error, Result};
use fm_config::{FloatRange, IntRange};
use fm_math::round_to;

/// How a single column is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawKind {
    /// Uniform integer in `[min, max]`.
    IntUniform { min: i64, max: i64 },
    /// Uniform float in `[low, high)`, optionally rounded.
    FloatUniform {
        low: f64,
        high: f64,
        decimals: Option<u32>,
    },
    /// Uniform choice from a categorical domain.
    Choice { domain: Vec<String> },
}

/// One step of a draw plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDraw {
    pub column: &'static str,
    pub kind: DrawKind,
}

/// Ordered list of column draws.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawPlan {
    draws: Vec<ColumnDraw>,
}

impl DrawPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(mut self, column: &'static str, range: IntRange) -> Self {
        self.draws.push(ColumnDraw {
            column,
            kind: DrawKind::IntUniform {
                min: range.min,
                max: range.max,
            },
        });
        self
    }

    pub fn float(mut self, column: &'static str, range: FloatRange) -> Self {
        self.draws.push(ColumnDraw {
            column,
            kind: DrawKind::FloatUniform {
                low: range.low,
                high: range.high,
                decimals: range.decimals,
            },
        });
        self
    }

    pub fn choice(mut self, column: &'static str, domain: &[String]) -> Self {
        self.draws.push(ColumnDraw {
            column,
            kind: DrawKind::Choice {
                domain: domain.to_vec(),
            },
        });
        self
    }

    pub fn draws(&self) -> &[ColumnDraw] {
        &self.draws
    }

    /// Column names in draw order.
    pub fn columns(&self) -> Vec<&'static str> {
        self.draws.iter().map(|d| d.column).collect()
    }

    /// Check every range and domain before anything is drawn.
    pub fn validate(&self) -> Result<()> {
        for (i, draw) in self.draws.iter().enumerate() {
            if self.draws[..i].iter().any(|d| d.column == draw.column) {
                return Err(Error::Generation(format!(
                    "column '{}' appears twice in the draw plan",
                    draw.column
                )));
            }
            match &draw.kind {
                DrawKind::IntUniform { min, max } => check_int_range(draw.column, *min, *max)?,
                DrawKind::FloatUniform { low, high, .. } => {
                    check_float_range(draw.column, *low, *high)?
                }
                DrawKind::Choice { domain } => {
                    if domain.is_empty() {
                        return Err(Error::EmptyDomain {
                            column: draw.column.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Execute the plan, drawing `rows` values per column.
    pub fn execute<R: Rng + ?Sized>(&self, rows: usize, rng: &mut R) -> Result<DrawnTable> {
        if rows == 0 {
            return Err(Error::Generation(
                "row count must be at least 1".to_string(),
            ));
        }
        self.validate()?;

        let mut columns = Vec::with_capacity(self.draws.len());
        for draw in &self.draws {
            debug!(column = draw.column, rows, "drawing column");
            let values = match &draw.kind {
                DrawKind::IntUniform { min, max } => DrawnColumn::Int(
                    (0..rows).map(|_| rng.random_range(*min..=*max)).collect(),
                ),
                DrawKind::FloatUniform {
                    low,
                    high,
                    decimals,
                } => {
                    let draw = FloatDraw::new(draw.column, *low, *high, *decimals)?;
                    DrawnColumn::Float((0..rows).map(|_| draw.sample(rng)).collect())
                }
                DrawKind::Choice { domain } => DrawnColumn::Label(
                    (0..rows)
                        .map(|_| domain[rng.random_range(0..domain.len())].clone())
                        .collect(),
                ),
            };
            columns.push((draw.column, values));
        }
        Ok(DrawnTable { rows, columns })
    }
}

/// Values drawn for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawnColumn {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Label(Vec<String>),
}

/// Column-major result of executing a [`DrawPlan`].
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnTable {
    rows: usize,
    columns: Vec<(&'static str, DrawnColumn)>,
}

impl DrawnTable {
    pub fn rows(&self) -> usize {
        self.rows
    }

    fn take(&mut self, column: &str) -> Result<DrawnColumn> {
        let idx = self
            .columns
            .iter()
            .position(|(name, _)| *name == column)
            .ok_or_else(|| Error::column_not_found(column))?;
        Ok(self.columns.remove(idx).1)
    }

    /// Remove and return an integer column.
    pub fn take_ints(&mut self, column: &str) -> Result<Vec<i64>> {
        match self.take(column)? {
            DrawnColumn::Int(v) => Ok(v),
            other => Err(type_error(column, "int", &other)),
        }
    }

    /// Remove and return a float column.
    pub fn take_floats(&mut self, column: &str) -> Result<Vec<f64>> {
        match self.take(column)? {
            DrawnColumn::Float(v) => Ok(v),
            other => Err(type_error(column, "float", &other)),
        }
    }

    /// Remove and return a categorical column.
    pub fn take_labels(&mut self, column: &str) -> Result<Vec<String>> {
        match self.take(column)? {
            DrawnColumn::Label(v) => Ok(v),
            other => Err(type_error(column, "text", &other)),
        }
    }
}

fn type_error(column: &str, expected: &str, actual: &DrawnColumn) -> Error {
    let actual = match actual {
        DrawnColumn::Int(_) => "int",
        DrawnColumn::Float(_) => "float",
        DrawnColumn::Label(_) => "text",
    };
    Error::ColumnType {
        column: column.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

pub(crate) fn check_int_range(column: &str, min: i64, max: i64) -> Result<()> {
    if min > max {
        return Err(Error::InvalidRange {
            column: column.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

fn invalid_float_range(column: &str, low: f64, high: f64) -> Error {
    Error::InvalidRange {
        column: column.to_string(),
        min: low.to_string(),
        max: high.to_string(),
    }
}

pub(crate) fn check_float_range(column: &str, low: f64, high: f64) -> Result<()> {
    if !(low.is_finite() && high.is_finite()) || low > high || !(high - low).is_finite() {
        return Err(invalid_float_range(column, low, high));
    }
    Ok(())
}

/// Uniform float sampler over `[low, high)`, optionally rounded.
///
/// A degenerate range yields `low` without consuming randomness.
#[derive(Debug, Clone)]
pub(crate) struct FloatDraw {
    low: f64,
    uniform: Option<Uniform<f64>>,
    decimals: Option<u32>,
}

impl FloatDraw {
    pub(crate) fn new(column: &str, low: f64, high: f64, decimals: Option<u32>) -> Result<Self> {
        check_float_range(column, low, high)?;
        let uniform = if low < high {
            Some(Uniform::new(low, high).map_err(|_| invalid_float_range(column, low, high))?)
        } else {
            None
        };
        Ok(Self {
            low,
            uniform,
            decimals,
        })
    }

    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let v = match &self.uniform {
            Some(uniform) => uniform.sample(rng),
            None => self.low,
        };
        match self.decimals {
            Some(d) => round_to(v, d),
            None => v,
        }
    }
}
