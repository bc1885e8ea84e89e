//! Hourly boiler/chiller utility records.

use std::fmt;

use chrono::{Duration, NaiveDateTime, Timelike};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use fm_common::{Error, Result};
use fm_config::{ShiftHours, UtilityDatasetConfig};
use fm_dataset::{Cell, ColumnDef, ColumnKind, Record};

use super::DrawPlan;

pub const DATE: &str = "Date";
pub const SHIFT: &str = "Shift";
pub const BOILER_LOAD: &str = "Boiler_Load_kg_hr";
pub const BOILER_STEAM: &str = "Boiler_Steam_ton_hr";
pub const BOILER_FUEL: &str = "Boiler_Fuel_L";
pub const CHILLER_LOAD: &str = "Chiller_Load_kW";
pub const CHILLER_RUNTIME: &str = "Chiller_RunTime_hr";
pub const PRODUCT_LINE: &str = "Product_Line";
pub const ENERGY_COST: &str = "Energy_Cost_USD";
pub const STATUS: &str = "Status";

const UTILITY_COLUMNS: [ColumnDef; 10] = [
    ColumnDef::new(DATE, ColumnKind::Timestamp),
    ColumnDef::new(SHIFT, ColumnKind::Text),
    ColumnDef::new(BOILER_LOAD, ColumnKind::Int),
    ColumnDef::new(BOILER_STEAM, ColumnKind::Float),
    ColumnDef::new(BOILER_FUEL, ColumnKind::Int),
    ColumnDef::new(CHILLER_LOAD, ColumnKind::Int),
    ColumnDef::new(CHILLER_RUNTIME, ColumnKind::Float),
    ColumnDef::new(PRODUCT_LINE, ColumnKind::Text),
    ColumnDef::new(ENERGY_COST, ColumnKind::Int),
    ColumnDef::new(STATUS, ColumnKind::Text),
];

/// Shift label derived from the hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Shift {
    Night,
    Morning,
    Afternoon,
}

impl Shift {
    pub fn for_hour(hour: u32, hours: &ShiftHours) -> Self {
        if hour < hours.night_end {
            Shift::Night
        } else if hour < hours.morning_end {
            Shift::Morning
        } else {
            Shift::Afternoon
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Shift::Night => "Night",
            Shift::Morning => "Morning",
            Shift::Afternoon => "Afternoon",
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hour of plant utility readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityRecord {
    pub timestamp: NaiveDateTime,
    pub shift: Shift,
    pub boiler_load: i64,
    pub boiler_steam: f64,
    pub boiler_fuel: i64,
    pub chiller_load: i64,
    pub chiller_runtime: f64,
    pub product_line: String,
    pub energy_cost: i64,
    pub status: String,
}

impl Record for UtilityRecord {
    fn schema() -> &'static [ColumnDef] {
        &UTILITY_COLUMNS
    }

    fn cell(&self, column: usize) -> Cell<'_> {
        match column {
            0 => Cell::Timestamp(self.timestamp),
            1 => Cell::Text(self.shift.as_str()),
            2 => Cell::Int(self.boiler_load),
            3 => Cell::Float(self.boiler_steam),
            4 => Cell::Int(self.boiler_fuel),
            5 => Cell::Int(self.chiller_load),
            6 => Cell::Float(self.chiller_runtime),
            7 => Cell::Text(&self.product_line),
            8 => Cell::Int(self.energy_cost),
            9 => Cell::Text(&self.status),
            _ => panic!("utility record has no column {column}"),
        }
    }
}

/// `rows` timestamps one hour apart starting at `start`.
pub fn hourly_timestamps(start: NaiveDateTime, rows: usize) -> Result<Vec<NaiveDateTime>> {
    (0..rows)
        .map(|i| {
            i64::try_from(i)
                .ok()
                .and_then(|h| start.checked_add_signed(Duration::hours(h)))
                .ok_or_else(|| {
                    Error::Generation(format!("timestamp {i} hours after {start} overflows"))
                })
        })
        .collect()
}

/// Draw plan for the randomly drawn utility columns, in declaration order.
///
/// `Date` and `Shift` are deterministic and consume no randomness.
pub fn utility_draw_plan(cfg: &UtilityDatasetConfig) -> DrawPlan {
    DrawPlan::new()
        .int(BOILER_LOAD, cfg.boiler_load)
        .float(BOILER_STEAM, cfg.boiler_steam)
        .int(BOILER_FUEL, cfg.boiler_fuel)
        .int(CHILLER_LOAD, cfg.chiller_load)
        .float(CHILLER_RUNTIME, cfg.chiller_runtime)
        .choice(PRODUCT_LINE, &cfg.product_lines)
        .int(ENERGY_COST, cfg.energy_cost)
        .choice(STATUS, &cfg.statuses)
}

/// Generate `cfg.days * 24` hourly utility records.
pub fn generate_utility<R: Rng + ?Sized>(
    cfg: &UtilityDatasetConfig,
    rng: &mut R,
) -> Result<Vec<UtilityRecord>> {
    let rows = cfg.rows();
    let timestamps = hourly_timestamps(cfg.start, rows)?;
    let mut drawn = utility_draw_plan(cfg).execute(rows, rng)?;

    let boiler_load = drawn.take_ints(BOILER_LOAD)?;
    let boiler_steam = drawn.take_floats(BOILER_STEAM)?;
    let boiler_fuel = drawn.take_ints(BOILER_FUEL)?;
    let chiller_load = drawn.take_ints(CHILLER_LOAD)?;
    let chiller_runtime = drawn.take_floats(CHILLER_RUNTIME)?;
    let mut product_line = drawn.take_labels(PRODUCT_LINE)?.into_iter();
    let energy_cost = drawn.take_ints(ENERGY_COST)?;
    let mut status = drawn.take_labels(STATUS)?.into_iter();

    let mut records = Vec::with_capacity(rows);
    for (i, timestamp) in timestamps.into_iter().enumerate() {
        let (Some(product_line), Some(status)) = (product_line.next(), status.next()) else {
            return Err(Error::Generation(format!("drawn columns end before row {i}")));
        };
        records.push(UtilityRecord {
            timestamp,
            shift: Shift::for_hour(timestamp.hour(), &cfg.shift_hours),
            boiler_load: boiler_load[i],
            boiler_steam: boiler_steam[i],
            boiler_fuel: boiler_fuel[i],
            chiller_load: chiller_load[i],
            chiller_runtime: chiller_runtime[i],
            product_line,
            energy_cost: energy_cost[i],
            status,
        });
    }

    info!(
        rows = records.len(),
        start = %cfg.start,
        "generated utility table"
    );
    Ok(records)
}
