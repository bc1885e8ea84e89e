//! Dataset generation configuration types.
//!
//! Defaults reproduce the two reference datasets: the per-shift cookie
//! production table and the hourly utility table for June 2025.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use fm_common::ExportFormat;

use crate::CONFIG_SCHEMA_VERSION;

/// Complete configuration for both pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FactoryConfig {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub shifts: ShiftDatasetConfig,

    #[serde(default)]
    pub utility: UtilityDatasetConfig,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            description: None,
            shifts: ShiftDatasetConfig::default(),
            utility: UtilityDatasetConfig::default(),
        }
    }
}

/// Inclusive integer range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    pub fn contains(&self, v: i64) -> bool {
        (self.min..=self.max).contains(&v)
    }
}

/// Half-open float range `[low, high)`, optionally rounded after drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FloatRange {
    pub low: f64,
    pub high: f64,

    /// Decimal places kept after drawing; `None` keeps full precision.
    #[serde(default)]
    pub decimals: Option<u32>,
}

impl FloatRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self {
            low,
            high,
            decimals: None,
        }
    }

    pub const fn rounded(low: f64, high: f64, decimals: u32) -> Self {
        Self {
            low,
            high,
            decimals: Some(decimals),
        }
    }

    /// Finite bounds, `low <= high`, and a width that is itself finite.
    pub fn is_valid(&self) -> bool {
        self.low.is_finite()
            && self.high.is_finite()
            && self.low <= self.high
            && (self.high - self.low).is_finite()
    }
}

/// Per-shift production dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ShiftDatasetConfig {
    /// Number of shift observations.
    pub rows: usize,

    /// RNG seed; a random seed is chosen (and reported) when absent.
    pub seed: Option<u64>,

    pub locations: Vec<String>,
    pub shifts: Vec<String>,

    pub produced: IntRange,
    pub downtime_min: IntRange,
    pub defects: IntRange,
    pub energy_kwh: IntRange,

    /// Shift length used as the downtime-rate denominator.
    pub shift_minutes: f64,

    pub output: PathBuf,
    pub format: ExportFormat,
}

impl Default for ShiftDatasetConfig {
    fn default() -> Self {
        Self {
            rows: 200,
            seed: Some(34),
            locations: labels(&["West Blg.", "North Blg.", "East Blg.", "South Blg."]),
            shifts: labels(&["Morning", "Afternoon", "Night"]),
            produced: IntRange::new(200, 699),
            downtime_min: IntRange::new(0, 59),
            defects: IntRange::new(0, 199),
            energy_kwh: IntRange::new(500, 699),
            shift_minutes: 480.0,
            output: PathBuf::from("manufacturing_data.csv"),
            format: ExportFormat::Csv,
        }
    }
}

/// Hour-of-day boundaries that assign the shift label.
///
/// `hour < night_end` is Night, `hour < morning_end` is Morning, anything
/// later is Afternoon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ShiftHours {
    pub night_end: u32,
    pub morning_end: u32,
}

impl Default for ShiftHours {
    fn default() -> Self {
        Self {
            night_end: 8,
            morning_end: 16,
        }
    }
}

/// Hourly utility dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct UtilityDatasetConfig {
    /// Timestamp of the first row.
    pub start: NaiveDateTime,

    /// Number of days; the table holds `days * 24` hourly rows.
    pub days: u32,

    pub seed: Option<u64>,

    pub shift_hours: ShiftHours,

    pub boiler_load: IntRange,
    pub boiler_steam: FloatRange,
    pub boiler_fuel: IntRange,
    pub chiller_load: IntRange,
    pub chiller_runtime: FloatRange,
    pub product_lines: Vec<String>,
    pub energy_cost: IntRange,
    pub statuses: Vec<String>,

    pub anomalies: AnomalyConfig,

    pub output: PathBuf,
    pub format: ExportFormat,
}

impl UtilityDatasetConfig {
    pub const HOURS_PER_DAY: usize = 24;

    pub fn rows(&self) -> usize {
        self.days as usize * Self::HOURS_PER_DAY
    }
}

impl Default for UtilityDatasetConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2025, 6, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .expect("default start timestamp is a valid date"),
            days: 30,
            seed: Some(42),
            shift_hours: ShiftHours::default(),
            boiler_load: IntRange::new(3500, 5199),
            boiler_steam: FloatRange::rounded(3.2, 4.5, 1),
            boiler_fuel: IntRange::new(450, 649),
            chiller_load: IntRange::new(200, 349),
            chiller_runtime: FloatRange::rounded(3.0, 9.0, 1),
            product_lines: labels(&["Chocolate", "Dairy", "Coffee", "Frozen Foods"]),
            energy_cost: IntRange::new(1000, 1399),
            statuses: labels(&["Normal", "Boiler High", "Chiller High", "Chiller Off", "Idle"]),
            anomalies: AnomalyConfig::default(),
            output: PathBuf::from("test.csv"),
            format: ExportFormat::Csv,
        }
    }
}

/// Injected inefficiency events, applied in field order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnomalyConfig {
    pub boiler_waste: BoilerWasteConfig,
    pub chiller_waste: ChillerWasteConfig,
    pub scheduling_issue: SchedulingIssueConfig,
}

impl AnomalyConfig {
    /// Configuration that injects nothing.
    pub fn none() -> Self {
        Self {
            boiler_waste: BoilerWasteConfig {
                count: 0,
                ..BoilerWasteConfig::default()
            },
            chiller_waste: ChillerWasteConfig {
                count: 0,
                ..ChillerWasteConfig::default()
            },
            scheduling_issue: SchedulingIssueConfig {
                count: 0,
                ..SchedulingIssueConfig::default()
            },
        }
    }

    pub fn total_count(&self) -> usize {
        self.boiler_waste.count + self.chiller_waste.count + self.scheduling_issue.count
    }
}

/// Boiler left idle: load and steam zeroed, fuel still burned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BoilerWasteConfig {
    pub count: usize,
    pub fuel: IntRange,
    pub cost_increment: i64,
}

impl Default for BoilerWasteConfig {
    fn default() -> Self {
        Self {
            count: 20,
            fuel: IntRange::new(400, 499),
            cost_increment: 200,
        }
    }
}

/// Chiller running without load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChillerWasteConfig {
    pub count: usize,
    pub runtime: FloatRange,
    pub cost_increment: i64,
}

impl Default for ChillerWasteConfig {
    fn default() -> Self {
        Self {
            count: 15,
            runtime: FloatRange::new(4.0, 7.0),
            cost_increment: 150,
        }
    }
}

/// Energy cost spike from poor scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SchedulingIssueConfig {
    pub count: usize,
    pub cost_increment: i64,
}

impl Default for SchedulingIssueConfig {
    fn default() -> Self {
        Self {
            count: 10,
            cost_increment: 300,
        }
    }
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
