//! Clap adapter for gatecfg.
//!
//! Compiled only when the `clap` Cargo feature is enabled (on by default).
//! [`ConfigArgs`] can be flattened into any clap `#[derive(Parser)]` struct to
//! get `get|update|set|restart|modules|settings-template` subcommands. The
//! only bridge to the core is [`ConfigArgs::into_action()`], which converts
//! parsed arguments into a [`ConfigAction`](crate::ConfigAction); everything
//! after that runs through the clap-free [`handle`](crate::handle).

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::document;
use crate::error::GatecfgError;
use crate::types::{ConfigAction, Domain};

fn parse_domain(s: &str) -> Result<Domain, String> {
    s.parse::<Domain>().map_err(|e| e.to_string())
}

/// Clap-derived args for the config subcommand group.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigSubcommand,
}

/// Available config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration of a domain.
    Get {
        #[arg(value_parser = parse_domain)]
        domain: Domain,
    },
    /// Deep-merge a YAML mapping into a domain.
    Update {
        #[arg(value_parser = parse_domain)]
        domain: Domain,
        /// Inline YAML mapping (e.g. "{access_point: {channel: 11}}").
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        patch: Option<String>,
        /// Read the YAML mapping from a file instead.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Set one value by dotted key.
    Set {
        #[arg(value_parser = parse_domain)]
        domain: Domain,
        /// Dotted key path (e.g. "access_point.ssid").
        key: String,
        /// Value, parsed as YAML (e.g. "11", "true", "[1.1.1.1]").
        value: String,
    },
    /// Restart the service behind a domain.
    Restart {
        #[arg(value_parser = parse_domain)]
        domain: Domain,
    },
    /// Inspect and manage installed modules.
    Modules(ModulesArgs),
    /// Print a commented service settings template.
    SettingsTemplate,
}

#[derive(Debug, Args)]
pub struct ModulesArgs {
    #[command(subcommand)]
    pub action: Option<ModulesSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum ModulesSubcommand {
    /// Installed modules and what else can be installed.
    List,
    /// Show one installed module.
    Get { id: String },
    /// Install a module from the catalog.
    Install { id: String },
    Enable { id: String },
    Disable { id: String },
    Remove { id: String },
}

impl ConfigArgs {
    /// Convert clap-parsed args into a framework-agnostic `ConfigAction`.
    ///
    /// Bare `modules` maps to `ConfigAction::ModulesList`. Fails only when an
    /// update patch cannot be read or parsed.
    pub fn into_action(self) -> Result<ConfigAction, GatecfgError> {
        Ok(match self.action {
            ConfigSubcommand::Get { domain } => ConfigAction::Get { domain },
            ConfigSubcommand::Update {
                domain,
                patch,
                file,
            } => {
                let patch = match (file, patch) {
                    (Some(path), _) => document::load_optional(&path)?.ok_or_else(|| {
                        GatecfgError::Io {
                            path: path.clone(),
                            source: std::io::Error::from(std::io::ErrorKind::NotFound),
                        }
                    })?,
                    (None, Some(text)) => document::parse_document(Path::new("<argument>"), &text)?,
                    (None, None) => Default::default(),
                };
                ConfigAction::Update { domain, patch }
            }
            ConfigSubcommand::Set { domain, key, value } => ConfigAction::Set { domain, key, value },
            ConfigSubcommand::Restart { domain } => ConfigAction::Restart { domain },
            ConfigSubcommand::Modules(ModulesArgs { action }) => match action {
                None | Some(ModulesSubcommand::List) => ConfigAction::ModulesList,
                Some(ModulesSubcommand::Get { id }) => ConfigAction::ModuleGet { id },
                Some(ModulesSubcommand::Install { id }) => ConfigAction::ModuleInstall { id },
                Some(ModulesSubcommand::Enable { id }) => ConfigAction::ModuleEnable { id },
                Some(ModulesSubcommand::Disable { id }) => ConfigAction::ModuleDisable { id },
                Some(ModulesSubcommand::Remove { id }) => ConfigAction::ModuleRemove { id },
            },
            ConfigSubcommand::SettingsTemplate => ConfigAction::SettingsTemplate,
        })
    }
}
