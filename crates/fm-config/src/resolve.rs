//! Config resolution: explicit path, then `FM_CONFIG`, then the user config
//! directory, then presets or built-in defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::dataset::FactoryConfig;
use crate::error::ConfigError;
use crate::preset::{get_preset, PresetName};
use crate::validate::validate_config;
use crate::{CONFIG_DIR_NAME, CONFIG_ENV_VAR};

/// Candidate config file locations, in priority order.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path given on the command line.
    pub explicit: Option<PathBuf>,
    /// Path named by the `FM_CONFIG` environment variable.
    pub env: Option<PathBuf>,
    /// `config.json` or `config.toml` in the user config directory, if present.
    pub user: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover candidate paths from the environment and user config dir.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        let env = std::env::var_os(CONFIG_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let user = dirs::config_dir().and_then(|dir| {
            let base = dir.join(CONFIG_DIR_NAME);
            ["config.json", "config.toml"]
                .iter()
                .map(|name| base.join(name))
                .find(|p| p.is_file())
        });
        Self {
            explicit,
            env,
            user,
        }
    }

    /// Only an explicit path; ignores environment and user config.
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit: Some(path.into()),
            ..Self::default()
        }
    }

    fn first(&self) -> Option<(&Path, ConfigOrigin)> {
        if let Some(p) = &self.explicit {
            return Some((p, ConfigOrigin::Cli));
        }
        if let Some(p) = &self.env {
            return Some((p, ConfigOrigin::Env));
        }
        self.user.as_deref().map(|p| (p, ConfigOrigin::User))
    }
}

#[derive(Debug, Clone, Copy)]
enum ConfigOrigin {
    Cli,
    Env,
    User,
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConfigSource {
    File(PathBuf),
    Env(PathBuf),
    User(PathBuf),
    Preset(String),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(p) => write!(f, "file:{}", p.display()),
            ConfigSource::Env(p) => write!(f, "env:{}", p.display()),
            ConfigSource::User(p) => write!(f, "user:{}", p.display()),
            ConfigSource::Preset(name) => write!(f, "preset:{name}"),
            ConfigSource::Defaults => write!(f, "defaults"),
        }
    }
}

/// A validated configuration and its origin.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: FactoryConfig,
    pub source: ConfigSource,
    pub warnings: Vec<String>,
}

/// Load a config file, choosing the parser by extension (`.toml` or JSON).
pub fn load_config_file(path: &Path) -> Result<FactoryConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load the effective configuration without validating it.
///
/// A preset, when named, takes precedence over every file location.
pub fn load_effective(
    paths: &ConfigPaths,
    preset: Option<PresetName>,
) -> Result<(FactoryConfig, ConfigSource), ConfigError> {
    Ok(match (preset, paths.first()) {
        (Some(name), _) => (get_preset(name), ConfigSource::Preset(name.to_string())),
        (None, Some((path, origin))) => {
            let config = load_config_file(path)?;
            let path = path.to_path_buf();
            let source = match origin {
                ConfigOrigin::Cli => ConfigSource::File(path),
                ConfigOrigin::Env => ConfigSource::Env(path),
                ConfigOrigin::User => ConfigSource::User(path),
            };
            (config, source)
        }
        (None, None) => (FactoryConfig::default(), ConfigSource::Defaults),
    })
}

/// Resolve and validate the effective configuration.
pub fn resolve_config(
    paths: &ConfigPaths,
    preset: Option<PresetName>,
) -> Result<ResolvedConfig, ConfigError> {
    let (config, source) = load_effective(paths, preset)?;
    let result = validate_config(&config);
    if !result.is_ok() {
        return Err(ConfigError::Invalid(result.errors));
    }
    Ok(ResolvedConfig {
        config,
        source,
        warnings: result.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_paths_yields_defaults() {
        let resolved = resolve_config(&ConfigPaths::default(), None).unwrap();
        assert_eq!(resolved.source, ConfigSource::Defaults);
        assert_eq!(resolved.config, FactoryConfig::default());
    }

    #[test]
    fn explicit_json_file_wins() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"schema_version": "1.0.0", "shifts": {{"rows": 12}}}}"#
        )
        .unwrap();
        let paths = ConfigPaths {
            explicit: Some(file.path().to_path_buf()),
            env: Some(PathBuf::from("/nonexistent/env.json")),
            user: None,
        };
        let resolved = resolve_config(&paths, None).unwrap();
        assert_eq!(resolved.config.shifts.rows, 12);
        assert!(matches!(resolved.source, ConfigSource::File(_)));
    }

    #[test]
    fn toml_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "schema_version = \"1.0.0\"").unwrap();
        writeln!(file, "[utility]").unwrap();
        writeln!(file, "days = 3").unwrap();
        let cfg = load_config_file(file.path()).unwrap();
        assert_eq!(cfg.utility.rows(), 72);
    }

    #[test]
    fn env_path_used_without_explicit() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"schema_version": "1.0.0"}}"#).unwrap();
        let paths = ConfigPaths {
            explicit: None,
            env: Some(file.path().to_path_buf()),
            user: None,
        };
        let resolved = resolve_config(&paths, None).unwrap();
        assert!(matches!(resolved.source, ConfigSource::Env(_)));
    }

    #[test]
    fn preset_overrides_files() {
        let paths = ConfigPaths::explicit("/nonexistent/config.json");
        let resolved = resolve_config(&paths, Some(PresetName::Quick)).unwrap();
        assert_eq!(resolved.source, ConfigSource::Preset("quick".to_string()));
    }

    #[test]
    fn missing_file_is_read_error() {
        let paths = ConfigPaths::explicit("/nonexistent/config.json");
        let err = resolve_config(&paths, None).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_config_rejected_with_all_errors() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"schema_version": "1.0.0", "shifts": {{"rows": 0, "shifts": []}}}}"#
        )
        .unwrap();
        let err = resolve_config(&ConfigPaths::explicit(file.path()), None).unwrap_err();
        match err {
            ConfigError::Invalid(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
