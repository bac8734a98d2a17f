//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/timeassign/timeassign.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `TIMEASSIGN_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::Scope;

/// Unified configuration for timeassign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Suffix of the default output file: `<stem>-<suffix>.json`
    pub output_suffix: String,
    /// Run once over the document or once per top-level sheet
    pub scope: Scope,
    /// Indent the written document
    pub pretty: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_suffix: "assigned".into(),
            scope: Scope::Document,
            pretty: true,
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub output_suffix: Option<String>,
    pub scope: Option<Scope>,
    pub pretty: Option<bool>,
}

/// Get the XDG config directory for timeassign.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "timeassign").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("timeassign.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Overlay wins where it specifies a value.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            output_suffix: overlay
                .output_suffix
                .clone()
                .unwrap_or_else(|| self.output_suffix.clone()),
            scope: overlay.scope.unwrap_or(self.scope),
            pretty: overlay.pretty.unwrap_or(self.pretty),
        }
    }

    /// Defaults overlaid with a single TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ApplicationError> {
        let raw = load_raw_settings(path)?;
        Ok(Self::default().merge_with(&raw))
    }

    /// Load settings with layered precedence.
    ///
    /// A missing global config is fine; a missing explicit `config_file` is an error.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("global config: {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = config_file {
            debug!("config file: {}", path.display());
            current = current.merge_with(&load_raw_settings(path)?);
        }

        Self::apply_env_overrides(current)
    }

    /// Apply TIMEASSIGN_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("TIMEASSIGN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("output_suffix") {
            settings.output_suffix = val;
        }
        if let Ok(val) = config.get_string("scope") {
            settings.scope = match val.to_ascii_lowercase().as_str() {
                "document" => Scope::Document,
                "sheet" => Scope::Sheet,
                other => {
                    return Err(ApplicationError::Config {
                        message: format!("TIMEASSIGN_SCOPE: unknown scope '{}'", other),
                    })
                }
            };
        }
        if let Ok(val) = config.get_bool("pretty") {
            settings.pretty = val;
        }

        Ok(settings)
    }

    /// Render settings as TOML (for `--show-config`).
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize settings: {}", e),
        })
    }
}
