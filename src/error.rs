use std::path::PathBuf;

use thiserror::Error;

use crate::types::Domain;

#[derive(Debug, Error)]
pub enum GatecfgError {
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Expected a mapping for '{key}' in {path}")]
    NotAMapping { path: PathBuf, key: String },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Unknown configuration domain '{0}'")]
    UnknownDomain(String),

    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    #[error("Module '{0}' is already installed")]
    ModuleAlreadyInstalled(String),

    #[error("Module '{0}' is a core module and cannot be disabled or removed")]
    CoreModuleProtected(String),

    #[error("Invalid update for '{domain}': {reason}")]
    InvalidUpdate { domain: Domain, reason: String },

    #[error("Service settings error: {0}")]
    Settings(#[from] confique::Error),

    #[error("Config directory is required: call .config_dir() on the builder")]
    ConfigDirRequired,
}

/// Coarse classification used by front ends to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Parse,
    Validation,
    Io,
}

impl GatecfgError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatecfgError::UnknownDomain(_) | GatecfgError::ModuleNotFound(_) => ErrorKind::NotFound,
            GatecfgError::Parse { .. } | GatecfgError::NotAMapping { .. } => ErrorKind::Parse,
            GatecfgError::ModuleAlreadyInstalled(_)
            | GatecfgError::CoreModuleProtected(_)
            | GatecfgError::InvalidUpdate { .. } => ErrorKind::Validation,
            GatecfgError::Io { .. }
            | GatecfgError::Serialize { .. }
            | GatecfgError::Settings(_)
            | GatecfgError::ConfigDirRequired => ErrorKind::Io,
        }
    }

    /// HTTP-equivalent status for the route layer.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Validation => 400,
            ErrorKind::Parse | ErrorKind::Io => 500,
        }
    }

    /// `{"error": "..."}` response body.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}
