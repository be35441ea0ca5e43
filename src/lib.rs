//! Layered YAML configuration for a router/gateway appliance.
//!
//! Gatecfg owns the configuration tree of the appliance: network interfaces,
//! wifi, firewall, tunnels, routing, system and access settings, and the
//! registry of installed modules. It reads, deep-merges and atomically
//! persists that tree across a handful of YAML files in one directory.
//!
//! ```ignore
//! let store = Gatecfg::builder().config_dir("/etc/gatecfg").build()?;
//! let wifi = store.wifi_config()?;
//! store.update_wifi_config(patch)?;
//! ```
//!
//! # Files
//!
//! | File | Role |
//! |------|------|
//! | `default_config.yaml` | shipped defaults, every domain under its own key |
//! | `user_config.yaml` | operator overrides, same shape |
//! | `network.yaml` | dedicated copy of the network interface settings |
//! | `wifi.yaml` | dedicated copy of the wifi settings |
//!
//! A `.yml` file is picked up when the `.yaml` one does not exist. No file is
//! required: with an empty directory every domain is served from the
//! compiled-in defaults, and nothing is created until the first write.
//!
//! # Layer precedence
//!
//! Reads pick the first layer that has the domain. Layers are not merged on
//! read; a domain in the user file replaces the default wholesale.
//!
//! ```text
//! Dedicated file        network.yaml / wifi.yaml, when present and non-empty
//!        ↓ else
//! User config           user_config.yaml[domain]
//!        ↓ else
//! Default config        default_config.yaml[domain]
//!        ↓ else
//! Built-in              compiled-in defaults
//! ```
//!
//! A file that cannot be read is logged and skipped. A file that exists but
//! does not parse is an error; a corrupt file never silently falls through to
//! defaults and is never overwritten.
//!
//! # Writes
//!
//! An update is a sparse mapping that is deep-merged into the stored domain:
//! nested mappings merge key by key, everything else (scalars, sequences,
//! `null`) replaces. The first write of a domain merges into the currently
//! effective view, so a partial update never drops default keys.
//!
//! Network and wifi settings are also mirrored into their dedicated files.
//! For network only the interface-related fields are routed there; wifi is
//! mirrored whole. Every write is a read-modify-write under a per-file lock,
//! so concurrent updates in one process never lose each other's changes.
//! Files are replaced by renaming a temp file, so readers see either the old
//! or the new document.
//!
//! # Modules
//!
//! [`ConfigStore::modules`] manages the `modules` domain: install from the
//! catalog, enable, disable and remove. Core modules (dashboard, network,
//! settings) cannot be disabled or removed. The `modules` domain cannot be
//! changed through the generic update.
//!
//! # Front ends
//!
//! All operations are available as [`ConfigAction`] values handled by
//! [`handle`], which returns a [`ConfigResult`] that renders as YAML or as a
//! JSON response body. Errors carry an HTTP-equivalent
//! [`status_code`](GatecfgError::status_code). The `cli` module (behind the
//! `clap` feature, on by default) maps command-line arguments onto
//! `ConfigAction`, and the `gatecfg` binary wires it all together.
//!
//! # Service settings
//!
//! Where the config tree lives, how to log and whether system changes are
//! applied to the host are read by [`settings::load`] from `GATECFG_*`
//! environment variables and a TOML file.

pub mod error;
pub mod logging;
pub mod merge;
pub mod settings;
pub mod system;
pub mod types;

#[cfg(feature = "clap")]
mod cli;
mod defaults;
mod document;
mod layout;
mod lock;
mod modules;
mod ops;
mod resolve;
mod store;

#[cfg(test)]
mod fixtures;

#[cfg(feature = "clap")]
pub use cli::{ConfigArgs, ConfigSubcommand, ModulesArgs, ModulesSubcommand};
pub use defaults::{CATALOG, ModuleDescriptor};
pub use error::{ErrorKind, GatecfgError};
pub use layout::Layout;
pub use modules::{ModuleEntry, ModuleListing, ModuleRegistry};
pub use ops::{ConfigResult, ModuleChange, handle};
pub use resolve::{LayerSource, Resolved, Resolver};
pub use store::{ConfigStore, ConfigStoreBuilder, Gatecfg, LiveApply, SystemView, UpdateOutcome};
pub use types::{ConfigAction, Document, Domain};
