use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::GatecfgError;
use crate::layout::Layout;
use crate::modules::ModuleRegistry;
use crate::resolve::{Resolved, Resolver};
use crate::settings::ServiceSettings;
use crate::system::{self, DryRunSystem, HostCommands, SystemControl};
use crate::types::{Document, Domain};

/// Entry point for building a configuration store.
pub struct Gatecfg;

impl Gatecfg {
    pub fn builder() -> ConfigStoreBuilder {
        ConfigStoreBuilder::new()
    }
}

/// Builder for a [`ConfigStore`] rooted at one config directory.
pub struct ConfigStoreBuilder {
    config_dir: Option<PathBuf>,
    extension: String,
    system: Option<Arc<dyn SystemControl>>,
}

impl ConfigStoreBuilder {
    fn new() -> Self {
        Self {
            config_dir: None,
            extension: "yaml".into(),
            system: None,
        }
    }

    /// The directory holding `default_config`, `user_config` and the
    /// per-domain files. Required.
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// File extension for every backing file (default: `yaml`).
    pub fn extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    /// Collaborator for live system changes (default: [`DryRunSystem`]).
    pub fn system(mut self, system: Arc<dyn SystemControl>) -> Self {
        self.system = Some(system);
        self
    }

    /// Take directory, extension and live-apply mode from service settings.
    pub fn from_settings(self, settings: &ServiceSettings) -> Self {
        let system: Arc<dyn SystemControl> = if settings.apply_live {
            Arc::new(HostCommands)
        } else {
            Arc::new(DryRunSystem)
        };
        self.config_dir(&settings.config_dir)
            .extension(&settings.extension)
            .system(system)
    }

    pub fn build(self) -> Result<ConfigStore, GatecfgError> {
        let root = self.config_dir.ok_or(GatecfgError::ConfigDirRequired)?;
        Ok(ConfigStore {
            resolver: Resolver::new(Layout::new(root, &self.extension)),
            system: self.system.unwrap_or_else(|| Arc::new(DryRunSystem)),
        })
    }
}

/// Outcome of pushing one setting to the running system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveApply {
    pub setting: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LiveApply {
    pub fn applied(&self) -> bool {
        self.error.is_none()
    }
}

/// The merged domain after an update, plus any live side effects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub config: Document,
    pub live: Vec<LiveApply>,
}

/// Typed view of the `system` fields that are consumed programmatically.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SystemView {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Per-domain get/update over the layered files.
pub struct ConfigStore {
    resolver: Resolver,
    system: Arc<dyn SystemControl>,
}

impl ConfigStore {
    pub fn layout(&self) -> &Layout {
        self.resolver.layout()
    }

    /// The effective document for a domain. Never writes.
    pub fn get(&self, domain: Domain) -> Result<Document, GatecfgError> {
        Ok(self.resolver.resolve_read(domain)?.document)
    }

    /// Like [`get`](Self::get), but also reports which layer answered.
    pub fn resolve(&self, domain: Domain) -> Result<Resolved, GatecfgError> {
        self.resolver.resolve_read(domain)
    }

    /// Deep-merge `partial` into the stored domain and return the result.
    ///
    /// `modules` cannot be updated here; use [`modules`](Self::modules).
    /// For `system`, `hostname` and `timezone` are validated before writing
    /// and pushed to the running system afterwards. A failed push is
    /// reported in [`UpdateOutcome::live`], the saved config stays.
    ///
    /// The returned config is the effective view, read back after writing.
    /// While `network.yaml` exists it answers network reads, so an update
    /// that only touches fields it does not carry (such as `mtu`) is saved to
    /// the user config but absent from the echoed view.
    pub fn update(&self, domain: Domain, partial: Document) -> Result<UpdateOutcome, GatecfgError> {
        if partial.is_empty() {
            return Err(GatecfgError::InvalidUpdate {
                domain,
                reason: "no settings provided".into(),
            });
        }
        if domain == Domain::Modules {
            return Err(GatecfgError::InvalidUpdate {
                domain,
                reason: "modules are managed through install, enable, disable and remove".into(),
            });
        }

        let changes = match domain {
            Domain::System => Some(validate_system(&partial)?),
            _ => None,
        };

        let resolved = self.resolver.resolve_write(domain, partial)?;
        let live = changes.map(|c| self.apply_live(&c)).unwrap_or_default();

        Ok(UpdateOutcome {
            config: resolved.document,
            live,
        })
    }

    /// Typed `hostname`/`timezone` from the effective system domain.
    pub fn system_view(&self) -> Result<SystemView, GatecfgError> {
        let resolved = self.resolver.resolve_read(Domain::System)?;
        let path = resolved
            .source
            .path()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("<built-in defaults>"));
        serde_yaml::from_value(Value::Mapping(resolved.document))
            .map_err(|source| GatecfgError::Parse { path, source })
    }

    /// Service restart hook. Nothing to restart yet; logs and reports success.
    pub fn restart(&self, domain: Domain) -> Result<String, GatecfgError> {
        tracing::info!(%domain, "restart requested");
        Ok(format!("{} service restarted successfully", domain.title()))
    }

    pub fn modules(&self) -> ModuleRegistry<'_> {
        ModuleRegistry::new(&self.resolver)
    }

    fn apply_live(&self, changes: &SystemView) -> Vec<LiveApply> {
        let mut live = Vec::new();
        if let Some(hostname) = &changes.hostname {
            let result = self.system.set_hostname(hostname);
            live.push(live_result("hostname", hostname, result));
        }
        if let Some(timezone) = &changes.timezone {
            let result = self.system.set_timezone(timezone);
            live.push(live_result("timezone", timezone, result));
        }
        live
    }
}

macro_rules! domain_accessors {
    ($($domain:ident => $get:ident, $update:ident;)*) => {
        impl ConfigStore {
            $(
                pub fn $get(&self) -> Result<Document, GatecfgError> {
                    self.get(Domain::$domain)
                }

                pub fn $update(&self, partial: Document) -> Result<UpdateOutcome, GatecfgError> {
                    self.update(Domain::$domain, partial)
                }
            )*
        }
    };
}

domain_accessors! {
    Network => network_config, update_network_config;
    Wifi => wifi_config, update_wifi_config;
    Firewall => firewall_config, update_firewall_config;
    Tunnel => tunnel_config, update_tunnel_config;
    Routing => routing_config, update_routing_config;
    System => system_config, update_system_config;
    Access => access_config, update_access_config;
}

/// `hostname` and `timezone`, when present, must be strings; the hostname
/// must be a valid host label and the timezone a zone name.
fn validate_system(partial: &Document) -> Result<SystemView, GatecfgError> {
    let hostname = string_field(partial, "hostname")?;
    let timezone = string_field(partial, "timezone")?;

    if let Some(name) = &hostname
        && !system::is_valid_hostname(name)
    {
        return Err(GatecfgError::InvalidUpdate {
            domain: Domain::System,
            reason: format!("invalid hostname '{name}'"),
        });
    }
    if let Some(zone) = &timezone
        && !system::is_valid_timezone(zone)
    {
        return Err(GatecfgError::InvalidUpdate {
            domain: Domain::System,
            reason: format!("invalid timezone '{zone}'"),
        });
    }
    Ok(SystemView { hostname, timezone })
}

fn string_field(partial: &Document, key: &str) -> Result<Option<String>, GatecfgError> {
    match partial.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(GatecfgError::InvalidUpdate {
            domain: Domain::System,
            reason: format!("'{key}' must be a string"),
        }),
    }
}

fn live_result(
    setting: &str,
    value: &str,
    result: Result<(), system::ApplyError>,
) -> LiveApply {
    let error = result.err().map(|e| {
        tracing::warn!(%setting, %value, error = %e, "saved but not applied to the running system");
        e.to_string()
    });
    LiveApply {
        setting: setting.into(),
        value: value.into(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{RecordingSystem, TestRoot, doc};

    #[test]
    fn build_requires_config_dir() {
        let err = Gatecfg::builder().build().err().unwrap();
        assert!(matches!(err, GatecfgError::ConfigDirRequired));
    }

    #[test]
    fn extension_is_applied_to_backing_files() {
        let root = TestRoot::new();
        let store = Gatecfg::builder()
            .config_dir(root.path())
            .extension(".yml")
            .build()
            .unwrap();
        assert_eq!(store.layout().user_config(), root.path().join("user_config.yml"));
    }

    #[test]
    fn fresh_install_serves_builtin_defaults() {
        let root = TestRoot::new();
        let store = root.store();
        let access = store.access_config().unwrap();
        assert_eq!(access["ssh"]["port"].as_u64(), Some(22));
        assert!(std::fs::read_dir(root.path()).unwrap().next().is_none());
    }

    #[test]
    fn update_returns_merged_document() {
        let root = TestRoot::new();
        let store = root.store();
        let outcome = store
            .update_firewall_config(doc("default_policy: {input: ACCEPT}"))
            .unwrap();
        assert_eq!(outcome.config["default_policy"]["input"].as_str(), Some("ACCEPT"));
        assert_eq!(outcome.config["default_policy"]["output"].as_str(), Some("ACCEPT"));
        assert_eq!(outcome.config["allow_ping"], Value::Bool(true));
        assert!(outcome.live.is_empty());
        assert_eq!(store.firewall_config().unwrap(), outcome.config);
    }

    #[test]
    fn empty_update_is_rejected() {
        let root = TestRoot::new();
        let err = root.store().update(Domain::Tunnel, Document::new()).unwrap_err();
        assert!(matches!(err, GatecfgError::InvalidUpdate { domain: Domain::Tunnel, .. }));
        assert!(!root.path().join("user_config.yaml").exists());
    }

    #[test]
    fn modules_cannot_be_updated_generically() {
        let root = TestRoot::new();
        let err = root
            .store()
            .update(Domain::Modules, doc("installed: []"))
            .unwrap_err();
        assert!(matches!(err, GatecfgError::InvalidUpdate { domain: Domain::Modules, .. }));
        assert_eq!(root.store().modules().installed().unwrap().len(), 6);
    }

    #[test]
    fn system_update_applies_hostname_and_timezone() {
        let root = TestRoot::new();
        let system = Arc::new(RecordingSystem::default());
        let store = root.store_with(system.clone());

        let outcome = store
            .update_system_config(doc("{hostname: edge-01, timezone: Europe/Berlin}"))
            .unwrap();

        assert_eq!(
            system.calls(),
            [
                ("hostname".to_string(), "edge-01".to_string()),
                ("timezone".to_string(), "Europe/Berlin".to_string()),
            ]
        );
        assert!(outcome.live.iter().all(LiveApply::applied));
        assert_eq!(outcome.config["ntp"]["enabled"], Value::Bool(true));
        assert_eq!(
            store.system_view().unwrap(),
            SystemView {
                hostname: Some("edge-01".into()),
                timezone: Some("Europe/Berlin".into()),
            }
        );
    }

    #[test]
    fn system_update_only_applies_changed_settings() {
        let root = TestRoot::new();
        let system = Arc::new(RecordingSystem::default());
        let store = root.store_with(system.clone());
        store.update_system_config(doc("ntp: {enabled: false}")).unwrap();
        assert!(system.calls().is_empty());
    }

    #[test]
    fn failed_live_apply_keeps_saved_config() {
        let root = TestRoot::new();
        let system = Arc::new(RecordingSystem::failing());
        let store = root.store_with(system);

        let outcome = store.update_system_config(doc("timezone: Asia/Tokyo")).unwrap();

        assert_eq!(outcome.live.len(), 1);
        assert!(!outcome.live[0].applied());
        assert!(outcome.live[0].error.as_deref().unwrap().contains("timezone"));
        assert_eq!(
            root.read("user_config.yaml")["system"]["timezone"].as_str(),
            Some("Asia/Tokyo")
        );
    }

    #[test]
    fn invalid_hostname_is_rejected_before_writing() {
        let root = TestRoot::new();
        let system = Arc::new(RecordingSystem::default());
        let store = root.store_with(system.clone());

        let err = store
            .update_system_config(doc("hostname: 'bad host'"))
            .unwrap_err();

        assert!(matches!(err, GatecfgError::InvalidUpdate { .. }));
        assert_eq!(err.status_code(), 400);
        assert!(system.calls().is_empty());
        assert!(!root.path().join("user_config.yaml").exists());
    }

    #[test]
    fn option_like_values_never_reach_the_system() {
        let root = TestRoot::new();
        let system = Arc::new(RecordingSystem::default());
        let store = root.store_with(system.clone());

        for patch in ["hostname: '-H'", "hostname: '--help'", "timezone: '-Hroot@host'"] {
            let err = store.update_system_config(doc(patch)).unwrap_err();
            assert!(matches!(err, GatecfgError::InvalidUpdate { .. }), "{patch}");
        }
        assert!(system.calls().is_empty());
        assert!(!root.path().join("user_config.yaml").exists());
    }

    #[test]
    fn non_string_timezone_is_rejected() {
        let root = TestRoot::new();
        let err = root
            .store()
            .update_system_config(doc("timezone: 5"))
            .unwrap_err();
        assert!(err.to_string().contains("'timezone' must be a string"));
    }

    #[test]
    fn network_update_dual_writes() {
        let root = TestRoot::new();
        let store = root.store();
        store
            .update_network_config(doc("dns_servers: [9.9.9.9]"))
            .unwrap();
        let network = root.read("network.yaml");
        assert_eq!(network["dns_servers"][0].as_str(), Some("9.9.9.9"));
        assert_eq!(
            root.read("user_config.yaml")["network"]["dns_servers"][0].as_str(),
            Some("9.9.9.9")
        );
    }

    #[test]
    fn restart_is_a_successful_stub() {
        let root = TestRoot::new();
        let message = root.store().restart(Domain::Firewall).unwrap();
        assert_eq!(message, "Firewall service restarted successfully");
    }
}
