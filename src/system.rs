//! Live system side effects applied after a `system` update is persisted.

use std::process::Command;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: String },
}

/// The host operations a `system` update may trigger.
pub trait SystemControl: Send + Sync {
    fn set_hostname(&self, hostname: &str) -> Result<(), ApplyError>;
    fn set_timezone(&self, timezone: &str) -> Result<(), ApplyError>;
}

/// Logs what would run and reports success. The default collaborator.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunSystem;

impl SystemControl for DryRunSystem {
    fn set_hostname(&self, hostname: &str) -> Result<(), ApplyError> {
        tracing::info!(%hostname, "dry run: would run hostnamectl set-hostname");
        Ok(())
    }

    fn set_timezone(&self, timezone: &str) -> Result<(), ApplyError> {
        tracing::info!(%timezone, "dry run: would run timedatectl set-timezone");
        Ok(())
    }
}

/// Applies settings through `hostnamectl` and `timedatectl`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostCommands;

impl HostCommands {
    fn run(program: &str, args: &[&str]) -> Result<(), ApplyError> {
        let command = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| ApplyError::Spawn {
                command: command.clone(),
                source,
            })?;
        if status.success() {
            tracing::info!(%command, "applied system setting");
            Ok(())
        } else {
            Err(ApplyError::Failed {
                command,
                status: status.to_string(),
            })
        }
    }
}

impl SystemControl for HostCommands {
    fn set_hostname(&self, hostname: &str) -> Result<(), ApplyError> {
        Self::run("hostnamectl", &["set-hostname", "--", hostname])
    }

    fn set_timezone(&self, timezone: &str) -> Result<(), ApplyError> {
        Self::run("timedatectl", &["set-timezone", "--", timezone])
    }
}

/// Hostnames the appliance accepts: ASCII letters, digits and `-`, not
/// starting with `-`.
pub fn is_valid_hostname(hostname: &str) -> bool {
    !hostname.is_empty()
        && hostname.len() <= 63
        && !hostname.starts_with('-')
        && hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Zone names like `Europe/Berlin` or `Etc/GMT+3`: ASCII letters, digits and
/// `_+-/`, not starting with `-` or `/`.
pub fn is_valid_timezone(timezone: &str) -> bool {
    !timezone.is_empty()
        && !timezone.starts_with(['-', '/'])
        && !timezone.split('/').any(str::is_empty)
        && timezone
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '/'))
}
