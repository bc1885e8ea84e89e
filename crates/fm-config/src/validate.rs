//! Semantic validation of a [`FactoryConfig`].
//!
//! Validation collects every problem instead of stopping at the first one,
//! so a user fixing a config file sees the full list in a single run.

use std::fmt;

use serde::Serialize;

use crate::dataset::{FactoryConfig, FloatRange, IntRange, ShiftDatasetConfig, UtilityDatasetConfig};

/// A single validation failure, addressed by a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Outcome of validation: hard errors plus advisory warnings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::new(path, message));
    }

    fn int_range(&mut self, path: &str, range: &IntRange) {
        if !range.is_valid() {
            self.error(
                path,
                format!("min ({}) must not exceed max ({})", range.min, range.max),
            );
        }
    }

    fn float_range(&mut self, path: &str, range: &FloatRange) {
        if !range.is_valid() {
            self.error(
                path,
                format!(
                    "bounds must be finite with low ({}) <= high ({}) and a finite width",
                    range.low, range.high
                ),
            );
        }
    }

    fn domain(&mut self, path: &str, values: &[String]) {
        if values.is_empty() {
            self.error(path, "categorical domain must not be empty");
        } else if values.iter().any(|v| v.trim().is_empty()) {
            self.error(path, "labels must not be blank");
        }
    }
}

/// Validate a full configuration.
pub fn validate_config(config: &FactoryConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if !fm_common::schema::is_compatible(&config.schema_version) {
        result.error(
            "schema_version",
            format!(
                "unsupported version {} (expected {}.x)",
                config.schema_version,
                crate::CONFIG_SCHEMA_VERSION
                    .split('.')
                    .next()
                    .unwrap_or("1")
            ),
        );
    }

    validate_shifts(&config.shifts, &mut result);
    validate_utility(&config.utility, &mut result);
    result
}

fn validate_shifts(cfg: &ShiftDatasetConfig, result: &mut ValidationResult) {
    if cfg.rows == 0 {
        result.error("shifts.rows", "must be at least 1");
    }
    result.domain("shifts.locations", &cfg.locations);
    result.domain("shifts.shifts", &cfg.shifts);
    result.int_range("shifts.produced", &cfg.produced);
    result.int_range("shifts.downtime_min", &cfg.downtime_min);
    result.int_range("shifts.defects", &cfg.defects);
    result.int_range("shifts.energy_kwh", &cfg.energy_kwh);

    if !(cfg.shift_minutes.is_finite() && cfg.shift_minutes > 0.0) {
        result.error("shifts.shift_minutes", "must be a positive number");
    }
    if cfg.produced.is_valid() && cfg.produced.min <= 0 {
        result.warnings.push(
            "shifts.produced allows zero or negative output; per-unit ratios may be non-finite"
                .to_string(),
        );
    }
    if cfg.defects.is_valid() && cfg.produced.is_valid() && cfg.defects.max > cfg.produced.min {
        result
            .warnings
            .push("shifts.defects can exceed shifts.produced; DefectRate may exceed 1".to_string());
    }
}

fn validate_utility(cfg: &UtilityDatasetConfig, result: &mut ValidationResult) {
    if cfg.days == 0 {
        result.error("utility.days", "must be at least 1");
    }

    let hours = cfg.shift_hours;
    if !(0 < hours.night_end && hours.night_end < hours.morning_end && hours.morning_end <= 24) {
        result.error(
            "utility.shift_hours",
            format!(
                "expected 0 < night_end ({}) < morning_end ({}) <= 24",
                hours.night_end, hours.morning_end
            ),
        );
    }

    result.int_range("utility.boiler_load", &cfg.boiler_load);
    result.float_range("utility.boiler_steam", &cfg.boiler_steam);
    result.int_range("utility.boiler_fuel", &cfg.boiler_fuel);
    result.int_range("utility.chiller_load", &cfg.chiller_load);
    result.float_range("utility.chiller_runtime", &cfg.chiller_runtime);
    result.domain("utility.product_lines", &cfg.product_lines);
    result.int_range("utility.energy_cost", &cfg.energy_cost);
    result.domain("utility.statuses", &cfg.statuses);

    let anomalies = &cfg.anomalies;
    result.int_range("utility.anomalies.boiler_waste.fuel", &anomalies.boiler_waste.fuel);
    result.float_range(
        "utility.anomalies.chiller_waste.runtime",
        &anomalies.chiller_waste.runtime,
    );

    let rows = cfg.rows();
    for (path, count) in [
        ("utility.anomalies.boiler_waste.count", anomalies.boiler_waste.count),
        ("utility.anomalies.chiller_waste.count", anomalies.chiller_waste.count),
        ("utility.anomalies.scheduling_issue.count", anomalies.scheduling_issue.count),
    ] {
        if count > rows {
            result.error(path, format!("{count} exceeds the {rows} generated rows"));
        }
    }
    if anomalies.total_count() > rows {
        result.warnings.push(format!(
            "{} anomaly rows requested over {} rows; injected subsets are guaranteed to overlap",
            anomalies.total_count(),
            rows
        ));
    }
}
