//! Config snapshots recorded alongside each run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::dataset::FactoryConfig;
use crate::resolve::ConfigSource;

/// Fingerprint of the configuration a run used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub schema_version: String,
    pub source: String,
    /// SHA-256 of the canonical JSON encoding.
    pub sha256: String,
    pub captured_at: DateTime<Utc>,
}

impl ConfigSnapshot {
    pub fn capture(
        config: &FactoryConfig,
        source: &ConfigSource,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            schema_version: config.schema_version.clone(),
            source: source.to_string(),
            sha256: config_hash(config)?,
            captured_at: Utc::now(),
        })
    }

    /// Short prefix of the hash for log lines.
    pub fn short_hash(&self) -> &str {
        &self.sha256[..self.sha256.len().min(12)]
    }
}

/// SHA-256 hex digest of the config's canonical JSON.
pub fn config_hash(config: &FactoryConfig) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(config)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
