//! Factory Metrics configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the dataset generation config
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation
//! - Config snapshots for run reports
//! - Configuration presets

pub mod dataset;
pub mod error;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use dataset::{
    AnomalyConfig, BoilerWasteConfig, ChillerWasteConfig, FactoryConfig, FloatRange, IntRange,
    SchedulingIssueConfig, ShiftDatasetConfig, ShiftHours, UtilityDatasetConfig,
};
pub use error::ConfigError;
pub use preset::{get_preset, list_presets, PresetError, PresetInfo, PresetName};
pub use resolve::{
    load_config_file, load_effective, resolve_config, ConfigPaths, ConfigSource, ResolvedConfig,
};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "FM_CONFIG";

/// Directory name under the user config dir.
pub const CONFIG_DIR_NAME: &str = "factory-metrics";
