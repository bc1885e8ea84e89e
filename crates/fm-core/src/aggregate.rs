//! Group-by aggregation over typed records.
//!
//! A [`GroupBy`] names one or more keys and a list of named reductions.
//! Running it over a slice of [`Record`]s yields a [`SummaryTable`] with one
//! row per distinct key combination, keys in ascending order. Column names
//! are resolved against the record schema before any row is read.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use fm_common::{Error, Result};
use fm_dataset::{Cell, ColumnData, ColumnKind, Columns, Record};
use fm_math::{round_to, Accumulator};

// ── Keys ────────────────────────────────────────────────────────────────

/// A grouping key value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Text(v) => f.write_str(v),
            KeyValue::Date(v) => write!(f, "{v}"),
            KeyValue::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

/// How a grouping key is taken from a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    /// The value of a discrete column.
    Column(String),
    /// The calendar date of a timestamp column.
    DateOf(String),
}

impl GroupKey {
    pub fn column(name: impl Into<String>) -> Self {
        GroupKey::Column(name.into())
    }

    pub fn date_of(name: impl Into<String>) -> Self {
        GroupKey::DateOf(name.into())
    }

    /// Output column name of the key.
    pub fn name(&self) -> &str {
        match self {
            GroupKey::Column(n) | GroupKey::DateOf(n) => n,
        }
    }
}

/// Row filter: keep rows whose text column is one of `one_of`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub one_of: Vec<String>,
}

impl Predicate {
    pub fn one_of(column: impl Into<String>, values: &[String]) -> Self {
        Self {
            column: column.into(),
            one_of: values.to_vec(),
        }
    }
}

// ── Reductions ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduction {
    Sum(String),
    Mean(String),
    Count,
    CountWhere(Predicate),
}

/// A named reduction; the name becomes the output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub name: String,
    pub reduction: Reduction,
}

impl Aggregation {
    pub fn sum(column: &str) -> Self {
        Self::named(column, Reduction::Sum(column.to_string()))
    }

    pub fn mean(column: &str) -> Self {
        Self::named(column, Reduction::Mean(column.to_string()))
    }

    pub fn count(name: &str) -> Self {
        Self::named(name, Reduction::Count)
    }

    pub fn count_where(name: &str, predicate: Predicate) -> Self {
        Self::named(name, Reduction::CountWhere(predicate))
    }

    pub fn named(name: &str, reduction: Reduction) -> Self {
        Self {
            name: name.to_string(),
            reduction,
        }
    }

    /// Rename the output column.
    pub fn alias(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

// ── Column resolution ───────────────────────────────────────────────────

pub(crate) fn type_error(column: &str, expected: &str, actual: ColumnKind) -> Error {
    Error::ColumnType {
        column: column.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedKey {
    index: usize,
    date_of: bool,
    pub(crate) kind: ColumnKind,
}

pub(crate) fn resolve_key<R: Record>(key: &GroupKey) -> Result<ResolvedKey> {
    match key {
        GroupKey::Column(name) => {
            let index = R::column_index(name)?;
            let kind = R::schema()[index].kind;
            if !kind.is_discrete() {
                return Err(type_error(name, "discrete", kind));
            }
            Ok(ResolvedKey {
                index,
                date_of: false,
                kind,
            })
        }
        GroupKey::DateOf(name) => {
            let index = R::column_index(name)?;
            let kind = R::schema()[index].kind;
            if kind != ColumnKind::Timestamp {
                return Err(type_error(name, "timestamp", kind));
            }
            Ok(ResolvedKey {
                index,
                date_of: true,
                kind: ColumnKind::Date,
            })
        }
    }
}

pub(crate) fn resolve_numeric<R: Record>(name: &str) -> Result<usize> {
    let index = R::column_index(name)?;
    let kind = R::schema()[index].kind;
    if !kind.is_numeric() {
        return Err(type_error(name, "numeric", kind));
    }
    Ok(index)
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedPredicate {
    index: usize,
    one_of: BTreeSet<String>,
}

impl ResolvedPredicate {
    pub(crate) fn resolve<R: Record>(p: &Predicate) -> Result<Self> {
        let index = R::column_index(&p.column)?;
        let kind = R::schema()[index].kind;
        if kind != ColumnKind::Text {
            return Err(type_error(&p.column, "text", kind));
        }
        Ok(Self {
            index,
            one_of: p.one_of.iter().cloned().collect(),
        })
    }

    pub(crate) fn matches<R: Record>(&self, row: &R) -> bool {
        row.cell(self.index)
            .as_text()
            .is_some_and(|t| self.one_of.contains(t))
    }
}

#[derive(Debug, Clone)]
enum ResolvedReduction {
    Sum(usize),
    Mean(usize),
    Count,
    CountWhere(ResolvedPredicate),
}

impl ResolvedReduction {
    fn resolve<R: Record>(r: &Reduction) -> Result<Self> {
        Ok(match r {
            Reduction::Sum(c) => ResolvedReduction::Sum(resolve_numeric::<R>(c)?),
            Reduction::Mean(c) => ResolvedReduction::Mean(resolve_numeric::<R>(c)?),
            Reduction::Count => ResolvedReduction::Count,
            Reduction::CountWhere(p) => {
                ResolvedReduction::CountWhere(ResolvedPredicate::resolve::<R>(p)?)
            }
        })
    }

    fn feed<R: Record>(&self, acc: &mut Accumulator, row: &R) {
        match self {
            ResolvedReduction::Sum(i) | ResolvedReduction::Mean(i) => {
                if let Some(v) = row.cell(*i).as_f64() {
                    acc.push(v);
                }
            }
            ResolvedReduction::Count => acc.push(1.0),
            ResolvedReduction::CountWhere(p) => {
                if p.matches(row) {
                    acc.push(1.0);
                }
            }
        }
    }

    fn finish(&self, acc: &Accumulator) -> f64 {
        match self {
            ResolvedReduction::Sum(_) => acc.sum(),
            ResolvedReduction::Mean(_) => acc.mean(),
            ResolvedReduction::Count | ResolvedReduction::CountWhere(_) => acc.count() as f64,
        }
    }
}

fn key_value(cell: Cell<'_>, date_of: bool) -> Option<KeyValue> {
    match cell {
        Cell::Int(v) => Some(KeyValue::Int(v)),
        Cell::Text(v) => Some(KeyValue::Text(v.to_string())),
        Cell::Timestamp(t) if date_of => Some(KeyValue::Date(t.date())),
        Cell::Timestamp(t) => Some(KeyValue::Timestamp(t)),
        Cell::Float(_) => None,
    }
}

fn key_column(kind: ColumnKind, values: impl Iterator<Item = KeyValue>) -> ColumnData {
    match kind {
        ColumnKind::Int => ColumnData::Int(
            values
                .filter_map(|k| match k {
                    KeyValue::Int(v) => Some(v),
                    _ => None,
                })
                .collect(),
        ),
        ColumnKind::Date => ColumnData::Date(
            values
                .filter_map(|k| match k {
                    KeyValue::Date(v) => Some(v),
                    _ => None,
                })
                .collect(),
        ),
        ColumnKind::Timestamp => ColumnData::Timestamp(
            values
                .filter_map(|k| match k {
                    KeyValue::Timestamp(v) => Some(v),
                    _ => None,
                })
                .collect(),
        ),
        ColumnKind::Text | ColumnKind::Float => {
            ColumnData::Text(values.map(|k| k.to_string()).collect())
        }
    }
}

// ── Group-by ────────────────────────────────────────────────────────────

/// Group-by query builder.
#[derive(Debug, Clone, Default)]
pub struct GroupBy {
    keys: Vec<GroupKey>,
    aggregations: Vec<Aggregation>,
    filter: Option<Predicate>,
    decimals: Option<u32>,
}

impl GroupBy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group by an explicit key.
    pub fn group(mut self, key: GroupKey) -> Self {
        self.keys.push(key);
        self
    }

    /// Group by a discrete column.
    pub fn key(mut self, column: &str) -> Self {
        self.keys.push(GroupKey::column(column));
        self
    }

    /// Group by the calendar date of a timestamp column.
    pub fn date_key(mut self, column: &str) -> Self {
        self.keys.push(GroupKey::date_of(column));
        self
    }

    pub fn agg(mut self, aggregation: Aggregation) -> Self {
        self.aggregations.push(aggregation);
        self
    }

    /// Only rows matching `predicate` are grouped.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// Round every reduced value to `decimals` places.
    pub fn round(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn keys(&self) -> &[GroupKey] {
        &self.keys
    }

    pub fn aggregations(&self) -> &[Aggregation] {
        &self.aggregations
    }

    pub fn run<R: Record>(&self, rows: &[R]) -> Result<SummaryTable> {
        if self.keys.is_empty() {
            return Err(Error::Aggregation("group-by needs at least one key".into()));
        }
        let keys = self
            .keys
            .iter()
            .map(resolve_key::<R>)
            .collect::<Result<Vec<_>>>()?;
        let reductions = self
            .aggregations
            .iter()
            .map(|a| ResolvedReduction::resolve::<R>(&a.reduction))
            .collect::<Result<Vec<_>>>()?;
        let filter = self
            .filter
            .as_ref()
            .map(ResolvedPredicate::resolve::<R>)
            .transpose()?;

        let mut groups: BTreeMap<Vec<KeyValue>, Vec<Accumulator>> = BTreeMap::new();
        for row in rows {
            if filter.as_ref().is_some_and(|f| !f.matches(row)) {
                continue;
            }
            let Some(key) = keys
                .iter()
                .map(|k| key_value(row.cell(k.index), k.date_of))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            let accs = groups
                .entry(key)
                .or_insert_with(|| vec![Accumulator::new(); reductions.len()]);
            for (r, acc) in reductions.iter().zip(accs.iter_mut()) {
                r.feed(acc, row);
            }
        }

        let summary_rows: Vec<SummaryRow> = groups
            .into_iter()
            .map(|(keys, accs)| SummaryRow {
                keys,
                values: reductions
                    .iter()
                    .zip(accs.iter())
                    .map(|(r, acc)| {
                        let v = r.finish(acc);
                        self.decimals.map_or(v, |d| round_to(v, d))
                    })
                    .collect(),
            })
            .collect();

        debug!(
            keys = ?self.keys.iter().map(GroupKey::name).collect::<Vec<_>>(),
            groups = summary_rows.len(),
            "grouped rows"
        );

        Ok(SummaryTable {
            key_columns: self.keys.iter().map(|k| k.name().to_string()).collect(),
            key_kinds: keys.iter().map(|k| k.kind).collect(),
            value_columns: self.aggregations.iter().map(|a| a.name.clone()).collect(),
            rows: summary_rows,
        })
    }
}

/// One group of a [`SummaryTable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub keys: Vec<KeyValue>,
    pub values: Vec<f64>,
}

/// Result of a group-by: key columns followed by reduced value columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub key_columns: Vec<String>,
    #[serde(skip)]
    pub key_kinds: Vec<ColumnKind>,
    pub value_columns: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn value_index(&self, column: &str) -> Result<usize> {
        self.value_columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| Error::column_not_found(column))
    }

    /// Value of `column` for the group with exactly `keys`.
    pub fn value(&self, keys: &[KeyValue], column: &str) -> Result<Option<f64>> {
        let idx = self.value_index(column)?;
        Ok(self
            .rows
            .iter()
            .find(|r| r.keys == keys)
            .map(|r| r.values[idx]))
    }

    /// All values of one reduced column, in key order.
    pub fn column(&self, column: &str) -> Result<Vec<f64>> {
        let idx = self.value_index(column)?;
        Ok(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    pub fn to_columns(&self) -> Result<Columns> {
        let mut out = Columns::new();
        for (i, (name, kind)) in self.key_columns.iter().zip(&self.key_kinds).enumerate() {
            let values = self.rows.iter().map(|r| r.keys[i].clone());
            out.push(name.clone(), key_column(*kind, values))?;
        }
        for (i, name) in self.value_columns.iter().enumerate() {
            out.push(
                name.clone(),
                ColumnData::Float(self.rows.iter().map(|r| r.values[i]).collect()),
            )?;
        }
        Ok(out)
    }
}

// ── Pivot ───────────────────────────────────────────────────────────────

/// Two-key reduction laid out as a matrix (unstacked).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub index_column: String,
    #[serde(skip)]
    pub index_kind: ColumnKind,
    pub value_column: String,
    pub index: Vec<KeyValue>,
    pub columns: Vec<KeyValue>,
    /// `cells[row][col]`; `None` where the combination has no rows.
    pub cells: Vec<Vec<Option<f64>>>,
}

impl PivotTable {
    pub fn get(&self, row: &KeyValue, col: &KeyValue) -> Option<f64> {
        let r = self.index.iter().position(|k| k == row)?;
        let c = self.columns.iter().position(|k| k == col)?;
        self.cells[r][c]
    }

    pub fn to_columns(&self) -> Result<Columns> {
        let mut out = Columns::new();
        out.push(
            self.index_column.clone(),
            key_column(self.index_kind, self.index.iter().cloned()),
        )?;
        for (c, label) in self.columns.iter().enumerate() {
            out.push(
                label.to_string(),
                ColumnData::NullableFloat(self.cells.iter().map(|row| row[c]).collect()),
            )?;
        }
        Ok(out)
    }
}

/// Reduce `value` over (`index`, `columns`) and unstack `columns`.
pub fn pivot<R: Record>(
    rows: &[R],
    index: GroupKey,
    columns: GroupKey,
    value: Aggregation,
    decimals: Option<u32>,
) -> Result<PivotTable> {
    let value_name = value.name.clone();
    let mut query = GroupBy {
        keys: vec![index, columns],
        aggregations: vec![value],
        filter: None,
        decimals: None,
    };
    if let Some(d) = decimals {
        query = query.round(d);
    }
    let summary = query.run(rows)?;

    let row_keys: Vec<KeyValue> = summary
        .rows
        .iter()
        .map(|r| r.keys[0].clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let col_keys: Vec<KeyValue> = summary
        .rows
        .iter()
        .map(|r| r.keys[1].clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut cells = vec![vec![None; col_keys.len()]; row_keys.len()];
    for r in &summary.rows {
        let (Ok(i), Ok(j)) = (
            row_keys.binary_search(&r.keys[0]),
            col_keys.binary_search(&r.keys[1]),
        ) else {
            continue;
        };
        cells[i][j] = Some(r.values[0]);
    }

    Ok(PivotTable {
        index_column: summary.key_columns[0].clone(),
        index_kind: summary.key_kinds[0],
        value_column: value_name,
        index: row_keys,
        columns: col_keys,
        cells,
    })
}

// ── Value counts ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Occurrences per label of a text column, most frequent first, ties by
/// label.
pub fn value_counts<R: Record>(rows: &[R], column: &str) -> Result<Vec<ValueCount>> {
    let index = R::column_index(column)?;
    let kind = R::schema()[index].kind;
    if kind != ColumnKind::Text {
        return Err(type_error(column, "text", kind));
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        if let Cell::Text(v) = row.cell(index) {
            *counts.entry(v).or_default() += 1;
        }
    }
    let mut out: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    Ok(out)
}

/// Convert value counts into a two-column table.
pub fn value_counts_columns(column: &str, counts: &[ValueCount]) -> Result<Columns> {
    let mut out = Columns::new();
    out.push(
        column,
        ColumnData::Text(counts.iter().map(|c| c.value.clone()).collect()),
    )?;
    out.push(
        "count",
        ColumnData::Int(counts.iter().map(|c| c.count as i64).collect()),
    )?;
    Ok(out)
}
