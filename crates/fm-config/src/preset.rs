//! Built-in configuration presets.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::dataset::FactoryConfig;

/// Named preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresetName {
    /// The reference datasets.
    Default,
    /// Small tables for smoke runs.
    Quick,
    /// Reference tables with a high share of injected anomalies.
    FaultHeavy,
}

impl PresetName {
    pub const ALL: [PresetName; 3] = [
        PresetName::Default,
        PresetName::Quick,
        PresetName::FaultHeavy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PresetName::Default => "default",
            PresetName::Quick => "quick",
            PresetName::FaultHeavy => "fault-heavy",
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("unknown preset '{0}' (available: default, quick, fault-heavy)")]
    Unknown(String),
}

impl FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PresetError::Unknown(s.to_string()))
    }
}

/// Preset listing entry.
#[derive(Debug, Clone, Serialize)]
pub struct PresetInfo {
    pub name: PresetName,
    pub description: &'static str,
    pub shift_rows: usize,
    pub utility_rows: usize,
    pub anomaly_rows: usize,
}

/// Build the configuration for a preset.
pub fn get_preset(name: PresetName) -> FactoryConfig {
    let mut cfg = FactoryConfig::default();
    match name {
        PresetName::Default => {}
        PresetName::Quick => {
            cfg.description = Some("small tables for smoke runs".to_string());
            cfg.shifts.rows = 24;
            cfg.utility.days = 2;
            cfg.utility.anomalies.boiler_waste.count = 4;
            cfg.utility.anomalies.chiller_waste.count = 3;
            cfg.utility.anomalies.scheduling_issue.count = 2;
        }
        PresetName::FaultHeavy => {
            cfg.description = Some("high share of injected anomalies".to_string());
            cfg.utility.anomalies.boiler_waste.count = 120;
            cfg.utility.anomalies.chiller_waste.count = 90;
            cfg.utility.anomalies.scheduling_issue.count = 60;
        }
    }
    cfg
}

/// Describe every preset.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .into_iter()
        .map(|name| {
            let cfg = get_preset(name);
            PresetInfo {
                name,
                description: match name {
                    PresetName::Default => "reference datasets (200 shifts, 720 hours)",
                    PresetName::Quick => "small tables for smoke runs",
                    PresetName::FaultHeavy => "reference tables with frequent anomalies",
                },
                shift_rows: cfg.shifts.rows,
                utility_rows: cfg.utility.rows(),
                anomaly_rows: cfg.utility.anomalies.total_count(),
            }
        })
        .collect()
}
