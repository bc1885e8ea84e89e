//! Derived shift metrics.
//!
//! Division follows IEEE-754: a zero denominator yields `inf` or NaN rather
//! than an error. The reference ranges keep `Cookies Produced >= 200`, so
//! non-finite values only appear with custom configs, and they are counted
//! and logged.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use fm_dataset::{Cell, ColumnDef, ColumnKind, Record};
use fm_math::ratio;

use crate::generate::shifts::SHIFT_COLUMNS;
use crate::generate::ShiftRecord;

pub const DEFECT_RATE: &str = "DefectRate";
pub const DOWNTIME_RATE: &str = "DowntimeRate";
pub const ENERGY_PER_UNIT: &str = "EnergyPerUnit";

const DERIVED_SHIFT_COLUMNS: [ColumnDef; 9] = [
    SHIFT_COLUMNS[0],
    SHIFT_COLUMNS[1],
    SHIFT_COLUMNS[2],
    SHIFT_COLUMNS[3],
    SHIFT_COLUMNS[4],
    SHIFT_COLUMNS[5],
    ColumnDef::new(DEFECT_RATE, ColumnKind::Float),
    ColumnDef::new(DOWNTIME_RATE, ColumnKind::Float),
    ColumnDef::new(ENERGY_PER_UNIT, ColumnKind::Float),
];

/// Ratios computed from one shift record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftMetrics {
    pub defect_rate: f64,
    pub downtime_rate: f64,
    pub energy_per_unit: f64,
}

impl ShiftMetrics {
    pub fn compute(record: &ShiftRecord, shift_minutes: f64) -> Self {
        let produced = record.produced as f64;
        Self {
            defect_rate: ratio(record.defects as f64, produced),
            downtime_rate: ratio(record.downtime_min as f64, shift_minutes),
            energy_per_unit: ratio(record.energy_kwh as f64, produced),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.defect_rate.is_finite()
            && self.downtime_rate.is_finite()
            && self.energy_per_unit.is_finite()
    }
}

/// A shift record with its derived ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedShiftRecord {
    pub base: ShiftRecord,
    pub metrics: ShiftMetrics,
}

impl DerivedShiftRecord {
    pub fn new(base: ShiftRecord, shift_minutes: f64) -> Self {
        let metrics = ShiftMetrics::compute(&base, shift_minutes);
        Self { base, metrics }
    }

    /// Recompute ratios from the base columns.
    pub fn recompute(&self, shift_minutes: f64) -> Self {
        Self::new(self.base.clone(), shift_minutes)
    }
}

impl Record for DerivedShiftRecord {
    fn schema() -> &'static [ColumnDef] {
        &DERIVED_SHIFT_COLUMNS
    }

    fn cell(&self, column: usize) -> Cell<'_> {
        match column {
            0..=5 => self.base.cell(column),
            6 => Cell::Float(self.metrics.defect_rate),
            7 => Cell::Float(self.metrics.downtime_rate),
            8 => Cell::Float(self.metrics.energy_per_unit),
            _ => panic!("derived shift record has no column {column}"),
        }
    }
}

/// Append derived ratios to every record.
pub fn derive_shift_metrics(rows: &[ShiftRecord], shift_minutes: f64) -> Vec<DerivedShiftRecord> {
    let derived: Vec<DerivedShiftRecord> = rows
        .iter()
        .map(|r| DerivedShiftRecord::new(r.clone(), shift_minutes))
        .collect();

    let non_finite = derived.iter().filter(|d| !d.metrics.is_finite()).count();
    if non_finite > 0 {
        warn!(
            non_finite,
            rows = derived.len(),
            "derived metrics contain non-finite values (zero denominator)"
        );
    }
    info!(rows = derived.len(), "derived shift metrics");
    derived
}
