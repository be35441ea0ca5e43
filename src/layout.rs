//! Backing locations: where each domain's data lives on disk.
//!
//! All files sit directly under one config root:
//!
//! ```text
//! <root>/default_config.yaml   keyed by domain, never written
//! <root>/user_config.yaml      keyed by domain, primary write target
//! <root>/network.yaml          network domain, unkeyed compatibility file
//! <root>/wifi.yaml             wifi domain, unkeyed compatibility file
//! ```
//!
//! The extension is configurable. When the configured extension is one of the
//! YAML spellings and that file is missing, the other spelling is used if it
//! exists, so an appliance that shipped `user_config.yml` keeps working.

use std::path::{Path, PathBuf};

use crate::types::Domain;

const YAML_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

const DEFAULT_STEM: &str = "default_config";
const USER_STEM: &str = "user_config";

/// How a compatibility file is kept in sync with the consolidated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatRouting {
    /// Only the listed top-level fields are mirrored.
    Fields(&'static [&'static str]),
    /// The whole update is mirrored.
    Whole,
}

/// Fields of a network update mirrored into `network.<ext>`.
pub const NETWORK_COMPAT_FIELDS: &[&str] = &[
    "interfaces",
    "wan_interface",
    "lan_interface",
    "dhcp_server",
    "hostname",
    "dns_servers",
];

/// A domain-dedicated file read directly by legacy consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compatibility {
    pub stem: &'static str,
    pub routing: CompatRouting,
}

/// Compatibility file for a domain, if it has one.
pub fn compatibility(domain: Domain) -> Option<Compatibility> {
    match domain {
        Domain::Network => Some(Compatibility {
            stem: "network",
            routing: CompatRouting::Fields(NETWORK_COMPAT_FIELDS),
        }),
        Domain::Wifi => Some(Compatibility {
            stem: "wifi",
            routing: CompatRouting::Whole,
        }),
        _ => None,
    }
}

/// A physical file plus the top-level key holding the domain (`None` when
/// the whole file is the domain's data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackingLocation {
    pub path: PathBuf,
    pub key: Option<&'static str>,
}

/// Which layer a location belongs to, in read priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Dedicated,
    User,
    Default,
}

#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    extension: String,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn default_config(&self) -> PathBuf {
        self.locate(DEFAULT_STEM)
    }

    pub fn user_config(&self) -> PathBuf {
        self.locate(USER_STEM)
    }

    pub fn dedicated(&self, domain: Domain) -> Option<PathBuf> {
        compatibility(domain).map(|c| self.locate(c.stem))
    }

    /// Read chain for a domain, highest priority first.
    pub fn read_chain(&self, domain: Domain) -> Vec<(Layer, BackingLocation)> {
        let mut chain = Vec::with_capacity(3);
        if let Some(path) = self.dedicated(domain) {
            chain.push((Layer::Dedicated, BackingLocation { path, key: None }));
        }
        chain.push((
            Layer::User,
            BackingLocation {
                path: self.user_config(),
                key: Some(domain.key()),
            },
        ));
        chain.push((
            Layer::Default,
            BackingLocation {
                path: self.default_config(),
                key: Some(domain.key()),
            },
        ));
        chain
    }

    /// `<root>/<stem>.<ext>`, or an existing file with the alternate YAML
    /// extension when the primary one is missing.
    fn locate(&self, stem: &str) -> PathBuf {
        let primary = self.root.join(format!("{stem}.{}", self.extension));
        if primary.exists() || !YAML_EXTENSIONS.contains(&self.extension.as_str()) {
            return primary;
        }
        YAML_EXTENSIONS
            .iter()
            .filter(|ext| **ext != self.extension)
            .map(|ext| self.root.join(format!("{stem}.{ext}")))
            .find(|alt| alt.exists())
            .unwrap_or(primary)
    }
}
