use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GatecfgError;

/// One persisted configuration tree: a string-keyed mapping whose values are
/// scalars, sequences or nested mappings. No schema is enforced.
pub type Document = serde_yaml::Mapping;

/// A logical configuration namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Network,
    Wifi,
    Firewall,
    Tunnel,
    Routing,
    System,
    Access,
    Modules,
}

impl Domain {
    pub const ALL: [Domain; 8] = [
        Domain::Network,
        Domain::Wifi,
        Domain::Firewall,
        Domain::Tunnel,
        Domain::Routing,
        Domain::System,
        Domain::Access,
        Domain::Modules,
    ];

    /// The top-level key this domain lives under in the consolidated files.
    pub fn key(self) -> &'static str {
        match self {
            Domain::Network => "network",
            Domain::Wifi => "wifi",
            Domain::Firewall => "firewall",
            Domain::Tunnel => "tunnel",
            Domain::Routing => "routing",
            Domain::System => "system",
            Domain::Access => "access",
            Domain::Modules => "modules",
        }
    }

    /// Capitalized name for messages: `Wifi`, `Firewall`.
    pub fn title(self) -> String {
        let mut chars = self.key().chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Domain {
    type Err = GatecfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|d| d.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GatecfgError::UnknownDomain(s.to_string()))
    }
}

/// A config operation, independent of any CLI or HTTP framework.
/// Front ends convert their parsed input into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    Get { domain: Domain },
    Update { domain: Domain, patch: Document },
    Set { domain: Domain, key: String, value: String },
    Restart { domain: Domain },
    ModulesList,
    ModuleGet { id: String },
    ModuleInstall { id: String },
    ModuleEnable { id: String },
    ModuleDisable { id: String },
    ModuleRemove { id: String },
    SettingsTemplate,
}
