//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::preset::PresetError;
use crate::validate::ValidationError;

/// Errors from loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{}", format_validation(.0))]
    Invalid(Vec<ValidationError>),

    #[error(transparent)]
    Preset(#[from] PresetError),
}

fn format_validation(errors: &[ValidationError]) -> String {
    let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!("config validation failed: {}", details.join("; "))
}

impl From<ConfigError> for fm_common::Error {
    fn from(err: ConfigError) -> Self {
        fm_common::Error::Config(err.to_string())
    }
}
