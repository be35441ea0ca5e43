//! Module registry: installed pseudo-packages and their lifecycle.
//!
//! ```text
//! NotInstalled --install--> Installed(enabled) <--set_enabled--> Installed(disabled)
//!                                   |
//!                                 remove
//!                                   v
//!                                Removed
//! ```
//!
//! Installed entries live in the `modules` domain as `{installed: [...]}`.
//! Every mutation rewrites the whole list under the domain's write lock. Core
//! modules (flagged in the catalog or on the stored entry) can never be
//! disabled or removed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::defaults::{self, ModuleDescriptor};
use crate::error::GatecfgError;
use crate::resolve::Resolver;
use crate::types::{Document, Domain};

const INSTALLED_KEY: &str = "installed";

/// One installed module. Fields absent from the stored entry stay absent on
/// rewrite, and unknown keys pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autostart: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core: Option<bool>,
    #[serde(flatten)]
    pub extra: Document,
}

impl ModuleEntry {
    fn from_descriptor(descriptor: &ModuleDescriptor) -> Self {
        Self {
            id: descriptor.id.into(),
            name: Some(descriptor.name.into()),
            version: Some(descriptor.version.into()),
            enabled: Some(true),
            autostart: Some(true),
            core: descriptor.core.then_some(true),
            extra: Document::new(),
        }
    }

    /// An entry without an `enabled` flag counts as enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn is_core(&self) -> bool {
        self.core.unwrap_or(false)
    }
}

/// Installed modules plus catalog entries that are not installed yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleListing {
    pub installed: Vec<ModuleEntry>,
    pub available: Vec<ModuleDescriptor>,
}

pub struct ModuleRegistry<'a> {
    resolver: &'a Resolver,
}

impl<'a> ModuleRegistry<'a> {
    pub fn new(resolver: &'a Resolver) -> Self {
        Self { resolver }
    }

    pub fn installed(&self) -> Result<Vec<ModuleEntry>, GatecfgError> {
        let resolved = self.resolver.resolve_read(Domain::Modules)?;
        let path = resolved
            .source
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("<built-in defaults>"));
        parse_installed(&path, &resolved.document)
    }

    pub fn list(&self) -> Result<ModuleListing, GatecfgError> {
        let installed = self.installed()?;
        let available = defaults::CATALOG
            .iter()
            .filter(|d| !installed.iter().any(|m| m.id == d.id))
            .copied()
            .collect();
        Ok(ModuleListing {
            installed,
            available,
        })
    }

    /// An installed module. Catalog entries that are not installed are not found.
    pub fn get(&self, id: &str) -> Result<ModuleEntry, GatecfgError> {
        self.installed()?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| GatecfgError::ModuleNotFound(id.into()))
    }

    /// Install a catalog module, enabled and autostarting. Reinstalling is rejected.
    pub fn install(&self, id: &str) -> Result<ModuleEntry, GatecfgError> {
        let descriptor =
            defaults::catalog_entry(id).ok_or_else(|| GatecfgError::ModuleNotFound(id.into()))?;

        let entry = self.mutate(|installed| {
            if installed.iter().any(|m| m.id == id) {
                return Err(GatecfgError::ModuleAlreadyInstalled(id.into()));
            }
            let entry = ModuleEntry::from_descriptor(descriptor);
            installed.push(entry.clone());
            Ok(entry)
        })?;

        tracing::info!(module = %id, "installed module");
        Ok(entry)
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<ModuleEntry, GatecfgError> {
        let entry = self.mutate(|installed| {
            let position = installed.iter().position(|m| m.id == id);
            check_known(id, position)?;
            if !enabled && is_core(id, position.map(|i| &installed[i])) {
                return Err(GatecfgError::CoreModuleProtected(id.into()));
            }
            let i = position.ok_or_else(|| GatecfgError::ModuleNotFound(id.into()))?;
            installed[i].enabled = Some(enabled);
            Ok(installed[i].clone())
        })?;

        tracing::info!(module = %id, enabled, "changed module state");
        Ok(entry)
    }

    /// Remove an installed module, returning the entry that was removed.
    pub fn remove(&self, id: &str) -> Result<ModuleEntry, GatecfgError> {
        let entry = self.mutate(|installed| {
            let position = installed.iter().position(|m| m.id == id);
            check_known(id, position)?;
            if is_core(id, position.map(|i| &installed[i])) {
                return Err(GatecfgError::CoreModuleProtected(id.into()));
            }
            let i = position.ok_or_else(|| GatecfgError::ModuleNotFound(id.into()))?;
            Ok(installed.remove(i))
        })?;

        tracing::info!(module = %id, "removed module");
        Ok(entry)
    }

    /// Read-modify-write of the whole installed list.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Vec<ModuleEntry>) -> Result<T, GatecfgError>,
    ) -> Result<T, GatecfgError> {
        let path = self.resolver.layout().user_config();
        let (_, output) = self.resolver.write_with(Domain::Modules, |current| {
            let mut installed = parse_installed(&path, current)?;
            let output = change(&mut installed)?;
            Ok((installed_document(&path, &installed)?, output))
        })?;
        Ok(output)
    }
}

/// Unknown means neither installed nor in the catalog.
fn check_known(id: &str, position: Option<usize>) -> Result<(), GatecfgError> {
    if position.is_none() && defaults::catalog_entry(id).is_none() {
        return Err(GatecfgError::ModuleNotFound(id.into()));
    }
    Ok(())
}

fn is_core(id: &str, stored: Option<&ModuleEntry>) -> bool {
    defaults::catalog_entry(id).is_some_and(|d| d.core) || stored.is_some_and(ModuleEntry::is_core)
}

fn parse_installed(path: &Path, modules: &Document) -> Result<Vec<ModuleEntry>, GatecfgError> {
    match modules.get(INSTALLED_KEY) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => {
            serde_yaml::from_value(value.clone()).map_err(|source| GatecfgError::Parse {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

fn installed_document(path: &Path, installed: &[ModuleEntry]) -> Result<Document, GatecfgError> {
    let list = serde_yaml::to_value(installed).map_err(|source| GatecfgError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    let mut doc = Document::new();
    doc.insert(INSTALLED_KEY.into(), list);
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{TestRoot, doc};

    fn ids(entries: &[ModuleEntry]) -> Vec<&str> {
        entries.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn defaults_list_core_and_tunnel_modules() {
        let root = TestRoot::new();
        let resolver = root.resolver();
        let installed = ModuleRegistry::new(&resolver).installed().unwrap();
        assert_eq!(
            ids(&installed),
            ["dashboard", "network", "settings", "openvpn", "wireguard", "tor"]
        );
    }

    #[test]
    fn listing_offers_only_uninstalled_catalog_entries() {
        let root = TestRoot::new();
        let resolver = root.resolver();
        let listing = ModuleRegistry::new(&resolver).list().unwrap();
        let available: Vec<&str> = listing.available.iter().map(|d| d.id).collect();
        assert!(available.contains(&"zerotier"));
        assert!(!available.contains(&"openvpn"));
        assert!(!available.contains(&"network"));
    }

    #[test]
    fn install_appends_enabled_entry() {
        let root = TestRoot::new();
        let resolver = root.resolver();
        let registry = ModuleRegistry::new(&resolver);

        let entry = registry.install("zerotier").unwrap();
        assert!(entry.is_enabled());
        assert_eq!(entry.autostart, Some(true));
        assert_eq!(entry.name.as_deref(), Some("ZeroTier One"));

        let installed = registry.installed().unwrap();
        assert_eq!(installed.last().unwrap().id, "zerotier");
        assert_eq!(installed.len(), 7);
        let stored = root.read("user_config.yaml");
        assert_eq!(stored["modules"]["installed"].as_sequence().unwrap().len(), 7);
    }

    #[test]
    fn install_unknown_module_is_not_found() {
        let root = TestRoot::new();
        let resolver = root.resolver();
        let err = ModuleRegistry::new(&resolver).install("doom").unwrap_err();
        assert!(matches!(err, GatecfgError::ModuleNotFound(ref id) if id == "doom"));
        assert!(!root.path().join("user_config.yaml").exists());
    }

    #[test]
    fn reinstall_is_rejected() {
        let root = TestRoot::new();
        let resolver = root.resolver();
        let registry = ModuleRegistry::new(&resolver);
        registry.install("sstp").unwrap();
        let err = registry.install("sstp").unwrap_err();
        assert!(matches!(err, GatecfgError::ModuleAlreadyInstalled(_)));
        let count = registry
            .installed()
            .unwrap()
            .iter()
            .filter(|m| m.id == "sstp")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn disabling_core_module_fails_and_keeps_state() {
        let root = TestRoot::new();
        let resolver = root.resolver();
        let registry = ModuleRegistry::new(&resolver);

        let err = registry.set_enabled("network", false).unwrap_err();
        assert!(matches!(err, GatecfgError::CoreModuleProtected(ref id) if id == "network"));
        assert!(registry.get("network").unwrap().is_enabled());
    }

    #[test]
    fn enabling_core_module_is_allowed() {
        let root = TestRoot::new();
        let resolver = root.resolver();
        let entry = ModuleRegistry::new(&resolver)
            .set_enabled("dashboard", true)
            .unwrap();
        assert!(entry.is_enabled());
    }

    #[test]
    fn stored_core_flag_protects_non_catalog_module() {
        let root = TestRoot::new();
        root.write(
            "user_config.yaml",
            "modules:\n  installed:\n    - {id: vendor-agent, name: Agent, version: 2.0.0, enabled: true, autostart: true, core: true}\n",
        );
        let resolver = root.resolver();
        let registry = ModuleRegistry::new(&resolver);
        assert!(matches!(
            registry.remove("vendor-agent"),
            Err(GatecfgError::CoreModuleProtected(_))
        ));
        assert!(matches!(
            registry.set_enabled("vendor-agent", false),
            Err(GatecfgError::CoreModuleProtected(_))
        ));
    }

    #[test]
    fn toggle_non_core_module() {
        let root = TestRoot::new();
        let resolver = root.resolver();
        let registry = ModuleRegistry::new(&resolver);

        registry.set_enabled("tor", true).unwrap();
        assert!(registry.get("tor").unwrap().is_enabled());
        registry.set_enabled("tor", false).unwrap();
        assert!(!registry.get("tor").unwrap().is_enabled());
    }

    #[test]
    fn set_enabled_unknown_module_is_not_found() {
        let root = TestRoot::new();
        let resolver = root.resolver();
        let err = ModuleRegistry::new(&resolver)
            .set_enabled("doom", true)
            .unwrap_err();
        assert!(matches!(err, GatecfgError::ModuleNotFound(_)));
    }

    #[test]
    fn set_enabled_catalog_module_not_installed_is_not_found() {
        let root = TestRoot::new();
        let resolver = root.resolver();
        let err = ModuleRegistry::new(&resolver)
            .set_enabled("pptp", true)
            .unwrap_err();
        assert!(matches!(err, GatecfgError::ModuleNotFound(_)));
    }

    #[test]
    fn removing_core_module_fails() {
        let root = TestRoot::new();
        let resolver = root.resolver();
        let registry = ModuleRegistry::new(&resolver);
        assert!(matches!(
            registry.remove("settings"),
            Err(GatecfgError::CoreModuleProtected(_))
        ));
        assert!(registry.get("settings").is_ok());
    }

    #[test]
    fn remove_then_get_is_not_found() {
        let root = TestRoot::new();
        root.write(
            "user_config.yaml",
            "modules:\n  installed:\n    - {id: tor, name: Tor, version: 1.0.0, enabled: false, autostart: false, core: false}\n",
        );
        let resolver = root.resolver();
        let registry = ModuleRegistry::new(&resolver);

        let removed = registry.remove("tor").unwrap();
        assert_eq!(removed.id, "tor");
        assert!(matches!(
            registry.get("tor"),
            Err(GatecfgError::ModuleNotFound(_))
        ));
        assert!(registry.installed().unwrap().is_empty());
    }

    #[test]
    fn remove_missing_module_is_not_found() {
        let root = TestRoot::new();
        root.write("user_config.yaml", "modules: {installed: []}\n");
        let resolver = root.resolver();
        assert!(matches!(
            ModuleRegistry::new(&resolver).remove("zerotier"),
            Err(GatecfgError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn unknown_entry_keys_survive_a_rewrite() {
        let root = TestRoot::new();
        root.write(
            "user_config.yaml",
            "modules:\n  repository: https://mirror.local\n  installed:\n    - {id: tor, name: Tor, version: 1.0.0, enabled: false, autostart: false, exit_country: de}\n",
        );
        let resolver = root.resolver();
        ModuleRegistry::new(&resolver)
            .set_enabled("tor", true)
            .unwrap();

        let stored = root.read("user_config.yaml");
        assert_eq!(stored["modules"]["repository"].as_str(), Some("https://mirror.local"));
        let tor = &stored["modules"]["installed"][0];
        assert_eq!(tor["exit_country"].as_str(), Some("de"));
        assert_eq!(tor["enabled"], Value::Bool(true));
        assert!(tor.get("core").is_none());
    }

    #[test]
    fn rewrite_leaves_sibling_entries_untouched() {
        let root = TestRoot::new();
        root.write(
            "user_config.yaml",
            "modules:\n  installed:\n  - id: openvpn\n    enabled: true\n  - id: tor\n    enabled: false\n    core: false\n",
        );
        let resolver = root.resolver();
        ModuleRegistry::new(&resolver)
            .set_enabled("tor", true)
            .unwrap();

        let stored = root.read("user_config.yaml");
        let installed = stored["modules"]["installed"].as_sequence().unwrap();
        let keys = |entry: &Value| -> Vec<String> {
            entry
                .as_mapping()
                .unwrap()
                .keys()
                .map(|k| k.as_str().unwrap().to_string())
                .collect()
        };
        assert_eq!(keys(&installed[0]), ["id", "enabled"]);
        assert_eq!(installed[0], Value::Mapping(doc("{id: openvpn, enabled: true}")));
        assert_eq!(keys(&installed[1]), ["id", "enabled", "core"]);
        assert_eq!(installed[1]["core"], Value::Bool(false));
        assert_eq!(installed[1]["enabled"], Value::Bool(true));
    }

    #[test]
    fn malformed_installed_list_is_parse_error() {
        let root = TestRoot::new();
        root.write("user_config.yaml", "modules: {installed: [{name: missing-id}]}\n");
        let resolver = root.resolver();
        assert!(matches!(
            ModuleRegistry::new(&resolver).installed(),
            Err(GatecfgError::Parse { .. })
        ));
    }
}
