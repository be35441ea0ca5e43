//! Config operations: dispatching a [`ConfigAction`] against a store and the
//! `ConfigResult` enum that callers use to display results.
//!
//! `Display` renders for a terminal; [`ConfigResult::to_json`] renders the
//! response body a route layer would send.

use std::fmt;

use serde::Serialize;
use serde_json::json;
use serde_yaml::Value;

use crate::error::GatecfgError;
use crate::modules::{ModuleEntry, ModuleListing};
use crate::settings;
use crate::store::{ConfigStore, UpdateOutcome};
use crate::types::{ConfigAction, Document, Domain};

/// What changed for a module mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleChange {
    Installed,
    StatusUpdated,
    Removed,
}

impl ModuleChange {
    fn verb(self) -> &'static str {
        match self {
            ModuleChange::Installed => "installed",
            ModuleChange::StatusUpdated => "status updated",
            ModuleChange::Removed => "removed",
        }
    }
}

/// Result of a config operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// The effective document for one domain.
    Config { domain: Domain, document: Document },
    /// The merged document after an update, with live-apply results.
    Updated {
        domain: Domain,
        outcome: UpdateOutcome,
    },
    Restarted { message: String },
    Modules(ModuleListing),
    Module(ModuleEntry),
    ModuleChanged {
        change: ModuleChange,
        module: ModuleEntry,
    },
    /// The commented service settings template.
    Template(String),
}

impl ConfigResult {
    /// JSON response body: `{domain: config}` for reads, a success envelope
    /// echoing the merged document for writes.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        Ok(match self {
            ConfigResult::Config { domain, document } => {
                let mut body = serde_json::Map::new();
                body.insert(domain.key().into(), serde_json::to_value(document)?);
                serde_json::Value::Object(body)
            }
            ConfigResult::Updated { domain, outcome } => {
                let mut body = json!({
                    "success": true,
                    "message": format!("{} configuration updated successfully", domain.title()),
                    "config": serde_json::to_value(&outcome.config)?,
                });
                if !outcome.live.is_empty() {
                    body["live"] = serde_json::to_value(&outcome.live)?;
                }
                body
            }
            ConfigResult::Restarted { message } => json!({ "success": true, "message": message }),
            ConfigResult::Modules(listing) => serde_json::to_value(listing)?,
            ConfigResult::Module(module) => serde_json::to_value(module)?,
            ConfigResult::ModuleChanged { change, module } => json!({
                "success": true,
                "message": format!("Module {} {} successfully", module.id, change.verb()),
                "module": serde_json::to_value(module)?,
            }),
            ConfigResult::Template(template) => json!({ "template": template }),
        })
    }
}

fn write_yaml<T: Serialize>(f: &mut fmt::Formatter<'_>, value: &T) -> fmt::Result {
    let rendered = serde_yaml::to_string(value).map_err(|_| fmt::Error)?;
    write!(f, "{}", rendered.trim_end())
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::Config { document, .. } => write_yaml(f, document),
            ConfigResult::Updated { outcome, .. } => {
                write_yaml(f, &outcome.config)?;
                for live in &outcome.live {
                    match &live.error {
                        None => write!(f, "\n# applied {} = {}", live.setting, live.value)?,
                        Some(err) => write!(
                            f,
                            "\n# saved {} = {} but not applied: {err}",
                            live.setting, live.value
                        )?,
                    }
                }
                Ok(())
            }
            ConfigResult::Restarted { message } => write!(f, "{message}"),
            ConfigResult::Modules(listing) => {
                write!(f, "Installed:")?;
                for m in &listing.installed {
                    let state = if m.is_enabled() { "enabled" } else { "disabled" };
                    let core = if m.is_core() { " (core)" } else { "" };
                    let version = m.version.as_deref().unwrap_or("-");
                    write!(f, "\n  {} {version} {state}{core}", m.id)?;
                }
                if !listing.available.is_empty() {
                    write!(f, "\nAvailable:")?;
                    for d in &listing.available {
                        write!(f, "\n  {} - {}", d.id, d.description)?;
                    }
                }
                Ok(())
            }
            ConfigResult::Module(module) => write_yaml(f, module),
            ConfigResult::ModuleChanged { change, module } => {
                write!(f, "Module {} {} successfully", module.id, change.verb())
            }
            ConfigResult::Template(t) => write!(f, "{t}"),
        }
    }
}

/// Run one action against the store.
pub fn handle(store: &ConfigStore, action: &ConfigAction) -> Result<ConfigResult, GatecfgError> {
    match action {
        ConfigAction::Get { domain } => Ok(ConfigResult::Config {
            domain: *domain,
            document: store.get(*domain)?,
        }),
        ConfigAction::Update { domain, patch } => Ok(ConfigResult::Updated {
            domain: *domain,
            outcome: store.update(*domain, patch.clone())?,
        }),
        ConfigAction::Set { domain, key, value } => Ok(ConfigResult::Updated {
            domain: *domain,
            outcome: store.update(*domain, dotted_patch(*domain, key, value)?)?,
        }),
        ConfigAction::Restart { domain } => Ok(ConfigResult::Restarted {
            message: store.restart(*domain)?,
        }),
        ConfigAction::ModulesList => Ok(ConfigResult::Modules(store.modules().list()?)),
        ConfigAction::ModuleGet { id } => Ok(ConfigResult::Module(store.modules().get(id)?)),
        ConfigAction::ModuleInstall { id } => Ok(ConfigResult::ModuleChanged {
            change: ModuleChange::Installed,
            module: store.modules().install(id)?,
        }),
        ConfigAction::ModuleEnable { id } => Ok(ConfigResult::ModuleChanged {
            change: ModuleChange::StatusUpdated,
            module: store.modules().set_enabled(id, true)?,
        }),
        ConfigAction::ModuleDisable { id } => Ok(ConfigResult::ModuleChanged {
            change: ModuleChange::StatusUpdated,
            module: store.modules().set_enabled(id, false)?,
        }),
        ConfigAction::ModuleRemove { id } => Ok(ConfigResult::ModuleChanged {
            change: ModuleChange::Removed,
            module: store.modules().remove(id)?,
        }),
        ConfigAction::SettingsTemplate => Ok(ConfigResult::Template(settings::template())),
    }
}

/// Build `{a: {b: value}}` from `a.b` and a YAML scalar. Text that is not
/// valid YAML is taken as a plain string.
pub fn dotted_patch(domain: Domain, key: &str, value: &str) -> Result<Document, GatecfgError> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(GatecfgError::InvalidUpdate {
            domain,
            reason: format!("invalid key '{key}'"),
        });
    }

    let mut current =
        serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.into()));
    for segment in segments.iter().rev() {
        let mut map = Document::new();
        map.insert(Value::String((*segment).into()), current);
        current = Value::Mapping(map);
    }

    match current {
        Value::Mapping(map) => Ok(map),
        _ => Err(GatecfgError::InvalidUpdate {
            domain,
            reason: format!("invalid key '{key}'"),
        }),
    }
}
