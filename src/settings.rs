//! Service settings: where the config tree lives and how the service logs.
//!
//! Resolved from, highest priority first: `GATECFG_*` environment variables,
//! an explicit settings file, `gatecfg.toml` in the platform config
//! directory, then the compiled defaults below.

use std::path::{Path, PathBuf};

use confique::Config;
use serde::{Deserialize, Serialize};

use crate::error::GatecfgError;

const APP_NAME: &str = "gatecfg";

#[derive(Config, Debug, Clone)]
pub struct ServiceSettings {
    /// Directory holding default_config, user_config and the per-domain files.
    #[config(default = "config", env = "GATECFG_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Extension of every backing file.
    #[config(default = "yaml", env = "GATECFG_EXTENSION")]
    pub extension: String,

    /// Run hostnamectl/timedatectl when system settings change. When false,
    /// changes are only logged.
    #[config(default = false, env = "GATECFG_APPLY_LIVE")]
    pub apply_live: bool,

    /// Logging.
    #[config(nested)]
    pub log: LogSettings,
}

#[derive(Config, Debug, Clone)]
pub struct LogSettings {
    /// Minimum level: trace, debug, info, warn or error. GATECFG_LOG takes
    /// a full filter directive and wins over this.
    #[config(default = "info", env = "GATECFG_LOG_LEVEL")]
    pub level: String,

    /// Output format: text or json.
    #[config(default = "text", env = "GATECFG_LOG_FORMAT")]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// `gatecfg.toml` in the platform config directory, if the platform has one.
pub fn platform_settings_path() -> Option<PathBuf> {
    let proj = directories::ProjectDirs::from("", "", APP_NAME)?;
    Some(proj.config_dir().join(format!("{APP_NAME}.toml")))
}

/// Load settings. An explicit file must exist; the platform file is optional.
pub fn load(explicit: Option<&Path>) -> Result<ServiceSettings, GatecfgError> {
    let mut builder = ServiceSettings::builder().env();
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(GatecfgError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        builder = builder.file(path);
    }
    if let Some(path) = platform_settings_path() {
        builder = builder.file(path);
    }
    Ok(builder.load()?)
}

/// A commented TOML template of every setting and its default.
pub fn template() -> String {
    confique::toml::template::<ServiceSettings>(confique::toml::FormatOptions::default())
}
