//! Column schemas for generated tables.
//!
//! Every pipeline stage has a fixed record type (raw, derived, summary).
//! Record types describe their columns once through [`Record::schema`] and
//! expose cells by position, which lets the aggregator resolve columns by
//! name and the writer build Arrow batches without per-type glue.

use std::fmt;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Date32Array, Float64Array, Int64Array, StringArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use fm_common::{Error, Result};

/// Logical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    Timestamp,
    Date,
}

impl ColumnKind {
    /// Numeric columns can feed sums and means.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Int | ColumnKind::Float)
    }

    /// Discrete columns can be used as grouping keys.
    pub fn is_discrete(self) -> bool {
        !matches!(self, ColumnKind::Float)
    }

    pub fn arrow_type(self) -> DataType {
        match self {
            ColumnKind::Int => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Text => DataType::Utf8,
            ColumnKind::Timestamp => DataType::Timestamp(TimeUnit::Second, None),
            ColumnKind::Date => DataType::Date32,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Int => write!(f, "int"),
            ColumnKind::Float => write!(f, "float"),
            ColumnKind::Text => write!(f, "text"),
            ColumnKind::Timestamp => write!(f, "timestamp"),
            ColumnKind::Date => write!(f, "date"),
        }
    }
}

/// Name and type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl ColumnDef {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// Borrowed view of a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Int(i64),
    Float(f64),
    Text(&'a str),
    Timestamp(NaiveDateTime),
}

impl Cell<'_> {
    /// Numeric value of the cell, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A typed row with a fixed column layout.
pub trait Record {
    /// Columns in declaration order. This order is the export header order.
    fn schema() -> &'static [ColumnDef];

    /// Cell at `column`, an index into [`Record::schema`].
    ///
    /// Implementations may panic on an out-of-range index; callers resolve
    /// indices through [`Record::column_index`].
    fn cell(&self, column: usize) -> Cell<'_>;

    /// Resolve a column name to its index.
    fn column_index(name: &str) -> Result<usize> {
        Self::schema()
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::column_not_found(name))
    }

    /// Resolve a column name to its definition.
    fn column(name: &str) -> Result<ColumnDef> {
        Self::column_index(name).map(|idx| Self::schema()[idx])
    }
}

/// Arrow schema for a record type.
pub fn arrow_schema<R: Record>() -> SchemaRef {
    let fields: Vec<Field> = R::schema()
        .iter()
        .map(|c| Field::new(c.name, c.kind.arrow_type(), false))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Typed rows as a record batch under [`arrow_schema`].
pub fn record_batch<R: Record>(rows: &[R]) -> Result<RecordBatch> {
    let columns = Columns::from_records(rows)?;
    let arrays: Vec<ArrayRef> = columns
        .columns
        .iter()
        .map(|(_, data)| data.to_array())
        .collect();
    RecordBatch::try_new(arrow_schema::<R>(), arrays).map_err(|e| Error::Export(e.to_string()))
}

/// Owned column values.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    /// Float column where some cells are empty (pivot gaps).
    NullableFloat(Vec<Option<f64>>),
    Text(Vec<String>),
    Timestamp(Vec<NaiveDateTime>),
    Date(Vec<NaiveDate>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::NullableFloat(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
            ColumnData::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn empty_like(kind: ColumnKind, capacity: usize) -> Self {
        match kind {
            ColumnKind::Int => ColumnData::Int(Vec::with_capacity(capacity)),
            ColumnKind::Float => ColumnData::Float(Vec::with_capacity(capacity)),
            ColumnKind::Text => ColumnData::Text(Vec::with_capacity(capacity)),
            ColumnKind::Timestamp => ColumnData::Timestamp(Vec::with_capacity(capacity)),
            ColumnKind::Date => ColumnData::Date(Vec::with_capacity(capacity)),
        }
    }

    fn push_cell(&mut self, cell: Cell<'_>) -> bool {
        match (self, cell) {
            (ColumnData::Int(v), Cell::Int(x)) => v.push(x),
            (ColumnData::Float(v), Cell::Float(x)) => v.push(x),
            (ColumnData::Text(v), Cell::Text(x)) => v.push(x.to_string()),
            (ColumnData::Timestamp(v), Cell::Timestamp(x)) => v.push(x),
            _ => return false,
        }
        true
    }

    fn data_type(&self) -> DataType {
        match self {
            ColumnData::Int(_) => DataType::Int64,
            ColumnData::Float(_) | ColumnData::NullableFloat(_) => DataType::Float64,
            ColumnData::Text(_) => DataType::Utf8,
            ColumnData::Timestamp(_) => DataType::Timestamp(TimeUnit::Second, None),
            ColumnData::Date(_) => DataType::Date32,
        }
    }

    fn to_array(&self) -> ArrayRef {
        match self {
            ColumnData::Int(v) => Arc::new(Int64Array::from(v.clone())),
            ColumnData::Float(v) => Arc::new(Float64Array::from(v.clone())),
            ColumnData::NullableFloat(v) => Arc::new(Float64Array::from(v.clone())),
            ColumnData::Text(v) => Arc::new(StringArray::from(v.clone())),
            ColumnData::Timestamp(v) => Arc::new(TimestampSecondArray::from(
                v.iter().map(|t| t.and_utc().timestamp()).collect::<Vec<i64>>(),
            )),
            ColumnData::Date(v) => {
                let epoch = DateTime::<Utc>::UNIX_EPOCH.date_naive();
                Arc::new(Date32Array::from(
                    v.iter()
                        .map(|d| d.signed_duration_since(epoch).num_days() as i32)
                        .collect::<Vec<i32>>(),
                ))
            }
        }
    }
}

/// Named, equally long columns: the column-major form of a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    columns: Vec<(String, ColumnData)>,
}

impl Columns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. All columns must have the same length.
    pub fn push(&mut self, name: impl Into<String>, data: ColumnData) -> Result<()> {
        let name = name.into();
        if let Some(len) = self.num_rows() {
            if data.len() != len {
                return Err(Error::Export(format!(
                    "column '{}' has {} rows, expected {}",
                    name,
                    data.len(),
                    len
                )));
            }
        }
        if self.columns.iter().any(|(n, _)| *n == name) {
            return Err(Error::Export(format!("duplicate column '{name}'")));
        }
        self.columns.push((name, data));
        Ok(())
    }

    /// Transpose typed rows into columns.
    pub fn from_records<R: Record>(rows: &[R]) -> Result<Self> {
        let schema = R::schema();
        let mut data: Vec<ColumnData> = schema
            .iter()
            .map(|c| ColumnData::empty_like(c.kind, rows.len()))
            .collect();
        for row in rows {
            for (idx, (def, column)) in schema.iter().zip(data.iter_mut()).enumerate() {
                let cell = row.cell(idx);
                if !column.push_cell(cell) {
                    return Err(Error::ColumnType {
                        column: def.name.to_string(),
                        expected: def.kind.to_string(),
                        actual: format!("{cell:?}"),
                    });
                }
            }
        }
        Ok(Self {
            columns: schema
                .iter()
                .map(|c| c.name.to_string())
                .zip(data)
                .collect(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Row count, or `None` for a table without columns.
    pub fn num_rows(&self) -> Option<usize> {
        self.columns.first().map(|(_, data)| data.len())
    }

    pub fn to_record_batch(&self) -> std::result::Result<RecordBatch, ArrowError> {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|(name, data)| {
                let nullable = matches!(data, ColumnData::NullableFloat(_));
                Field::new(name.as_str(), data.data_type(), nullable)
            })
            .collect();
        let arrays: Vec<ArrayRef> = self.columns.iter().map(|(_, data)| data.to_array()).collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reading {
        at: NaiveDateTime,
        line: String,
        load: i64,
        ratio: f64,
    }

    const READING_SCHEMA: &[ColumnDef] = &[
        ColumnDef::new("At", ColumnKind::Timestamp),
        ColumnDef::new("Line", ColumnKind::Text),
        ColumnDef::new("Load", ColumnKind::Int),
        ColumnDef::new("Ratio", ColumnKind::Float),
    ];

    impl Record for Reading {
        fn schema() -> &'static [ColumnDef] {
            READING_SCHEMA
        }

        fn cell(&self, column: usize) -> Cell<'_> {
            match column {
                0 => Cell::Timestamp(self.at),
                1 => Cell::Text(&self.line),
                2 => Cell::Int(self.load),
                3 => Cell::Float(self.ratio),
                _ => panic!("column index {column} out of range"),
            }
        }
    }

    fn sample() -> Vec<Reading> {
        let at = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        vec![
            Reading {
                at,
                line: "Dairy".into(),
                load: 3500,
                ratio: 0.5,
            },
            Reading {
                at: at + chrono::Duration::hours(1),
                line: "Coffee".into(),
                load: 4100,
                ratio: 0.25,
            },
        ]
    }

    #[test]
    fn column_lookup_by_name() {
        assert_eq!(Reading::column_index("Load").unwrap(), 2);
        assert_eq!(Reading::column("Ratio").unwrap().kind, ColumnKind::Float);
        let err = Reading::column_index("Missing").unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { .. }));
    }

    #[test]
    fn arrow_schema_matches_declaration_order() {
        let schema = arrow_schema::<Reading>();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["At", "Line", "Load", "Ratio"]);
        assert_eq!(
            schema.field(0).data_type(),
            &DataType::Timestamp(TimeUnit::Second, None)
        );
    }

    #[test]
    fn records_transpose_to_columns() {
        let columns = Columns::from_records(&sample()).unwrap();
        assert_eq!(columns.num_columns(), 4);
        assert_eq!(columns.num_rows(), Some(2));
        assert_eq!(columns.get("Load"), Some(&ColumnData::Int(vec![3500, 4100])));
        let batch = columns.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().as_ref(), arrow_schema::<Reading>().as_ref());
    }

    #[test]
    fn record_batch_uses_declared_schema() {
        let batch = record_batch(&sample()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema(), arrow_schema::<Reading>());
        assert!(record_batch::<Reading>(&[]).unwrap().num_rows() == 0);
    }

    #[test]
    fn mismatched_column_lengths_rejected() {
        let mut columns = Columns::new();
        columns.push("a", ColumnData::Int(vec![1, 2])).unwrap();
        assert!(columns.push("b", ColumnData::Float(vec![1.0])).is_err());
        assert!(columns.push("a", ColumnData::Int(vec![3, 4])).is_err());
    }

    #[test]
    fn nullable_floats_become_nullable_fields() {
        let mut columns = Columns::new();
        columns
            .push("Date", ColumnData::Date(vec![NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()]))
            .unwrap();
        columns
            .push("Dairy", ColumnData::NullableFloat(vec![None]))
            .unwrap();
        let batch = columns.to_record_batch().unwrap();
        assert!(batch.schema().field(1).is_nullable());
        assert_eq!(batch.column(1).null_count(), 1);
    }

    #[test]
    fn kind_predicates() {
        assert!(ColumnKind::Int.is_numeric());
        assert!(ColumnKind::Int.is_discrete());
        assert!(!ColumnKind::Float.is_discrete());
        assert!(!ColumnKind::Text.is_numeric());
    }
}
