//! Layered resolution: decide which file a domain is read from and where an
//! update lands.
//!
//! Reads walk the chain from [`Layout::read_chain`] and stop at the first hit:
//!
//! 1. the domain's compatibility file (network, wifi), if present and non-empty
//! 2. the user config, if it has the domain's key
//! 3. the default config, if it has the domain's key
//! 4. the compiled-in default for the domain
//!
//! An unreadable file (permissions and the like) is logged and skipped. A file
//! that exists but does not parse stops resolution with an error, so a corrupt
//! file is never mistaken for an absent one.
//!
//! Writes merge into the user config under the domain's key and, for domains
//! with a compatibility file, mirror the routed part of the update into that
//! file as well. Both files are locked (user config first) for the whole
//! read-modify-write, and nothing is written unless both documents loaded.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::defaults;
use crate::document;
use crate::error::GatecfgError;
use crate::layout::{self, CompatRouting, Layer, Layout};
use crate::lock::with_path_lock;
use crate::merge::{deep_merge, merge_into};
use crate::types::{Document, Domain};

/// Where a resolved domain document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSource {
    Dedicated(PathBuf),
    User(PathBuf),
    DefaultFile(PathBuf),
    Builtin,
}

impl LayerSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            LayerSource::Dedicated(p) | LayerSource::User(p) | LayerSource::DefaultFile(p) => {
                Some(p)
            }
            LayerSource::Builtin => None,
        }
    }
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSource::Dedicated(p) => write!(f, "compatibility file {}", p.display()),
            LayerSource::User(p) => write!(f, "user config {}", p.display()),
            LayerSource::DefaultFile(p) => write!(f, "default config {}", p.display()),
            LayerSource::Builtin => f.write_str("built-in defaults"),
        }
    }
}

/// A domain's document plus the layer it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub source: LayerSource,
    pub document: Document,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    layout: Layout,
}

impl Resolver {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Resolve the current view of `domain`. Never writes.
    pub fn resolve_read(&self, domain: Domain) -> Result<Resolved, GatecfgError> {
        for (layer, location) in self.layout.read_chain(domain) {
            let doc = match document::load_optional(&location.path) {
                Ok(Some(doc)) => doc,
                Ok(None) => continue,
                Err(GatecfgError::Io { path, source }) => {
                    tracing::warn!(
                        %domain,
                        path = %path.display(),
                        error = %source,
                        "config layer unreadable, trying next"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            let found = match location.key {
                None if doc.is_empty() => None,
                None => Some(doc),
                Some(key) => doc
                    .get(key)
                    .map(|value| domain_value(&location.path, key, value))
                    .transpose()?,
            };

            if let Some(document) = found {
                let source = match layer {
                    Layer::Dedicated => LayerSource::Dedicated(location.path),
                    Layer::User => LayerSource::User(location.path),
                    Layer::Default => LayerSource::DefaultFile(location.path),
                };
                tracing::debug!(%domain, %source, "resolved config domain");
                return Ok(Resolved { source, document });
            }
        }

        tracing::debug!(%domain, "resolved config domain from built-in defaults");
        Ok(Resolved {
            source: LayerSource::Builtin,
            document: defaults::builtin_domain(domain),
        })
    }

    /// Deep-merge `partial` into the domain and return the resulting view.
    pub fn resolve_write(&self, domain: Domain, partial: Document) -> Result<Resolved, GatecfgError> {
        self.write_with(domain, |_| Ok((partial, ())))
            .map(|(resolved, ())| resolved)
    }

    /// Read-modify-write under the domain's write locks.
    ///
    /// `update_for` receives the domain's current stored document (or the
    /// resolved view when the user config has no entry yet) and returns the
    /// partial update to merge plus a value handed back to the caller.
    /// Returning an error aborts without writing.
    pub fn write_with<T, F>(&self, domain: Domain, update_for: F) -> Result<(Resolved, T), GatecfgError>
    where
        F: FnOnce(&Document) -> Result<(Document, T), GatecfgError>,
    {
        let user_path = self.layout.user_config();

        with_path_lock(&user_path, || -> Result<(Resolved, T), GatecfgError> {
            let mut user = document::load(&user_path)?;
            let base = match user.get(domain.key()) {
                Some(value) => domain_value(&user_path, domain.key(), value)?,
                None => self.resolve_read(domain)?.document,
            };

            let (update, output) = update_for(&base)?;
            let merged = deep_merge(base, update.clone());
            user.insert(domain.key().into(), Value::Mapping(merged.clone()));

            let compat = layout::compatibility(domain).zip(self.layout.dedicated(domain));
            match compat {
                Some((compat, compat_path)) => {
                    with_path_lock(&compat_path, || -> Result<(), GatecfgError> {
                        let mirrored =
                            compat_document(&compat_path, compat.routing, &update, &merged)?;
                        document::save(&user_path, &user)?;
                        if let Some(mirrored) = mirrored {
                            document::save(&compat_path, &mirrored)?;
                        }
                        Ok(())
                    })?;
                }
                None => document::save(&user_path, &user)?,
            }

            Ok((self.resolve_read(domain)?, output))
        })
    }
}

/// A domain's value inside a keyed document: `null` reads as empty.
fn domain_value(path: &Path, key: &str, value: &Value) -> Result<Document, GatecfgError> {
    match value {
        Value::Mapping(map) => Ok(map.clone()),
        Value::Null => Ok(Document::new()),
        _ => Err(GatecfgError::NotAMapping {
            path: path.to_path_buf(),
            key: key.into(),
        }),
    }
}

/// The part of `doc` a compatibility file carries.
fn routed_part(doc: &Document, routing: CompatRouting) -> Document {
    match routing {
        CompatRouting::Whole => doc.clone(),
        CompatRouting::Fields(fields) => doc
            .iter()
            .filter(|(k, _)| k.as_str().is_some_and(|k| fields.contains(&k)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

/// Next content of the compatibility file, or `None` when the update touches
/// nothing it carries. A missing or empty file is seeded from the merged
/// view so it never holds only a fragment.
fn compat_document(
    path: &Path,
    routing: CompatRouting,
    update: &Document,
    merged: &Document,
) -> Result<Option<Document>, GatecfgError> {
    let routed = routed_part(update, routing);
    if routed.is_empty() {
        return Ok(None);
    }

    let current = document::load_optional(path)?.filter(|doc| !doc.is_empty());
    let next = match current {
        None => routed_part(merged, routing),
        Some(mut current) => {
            match routing {
                CompatRouting::Whole => merge_into(&mut current, routed),
                CompatRouting::Fields(_) => apply_fields(&mut current, routed),
            }
            current
        }
    };
    Ok(Some(next))
}

/// Field routing: top-level overwrite, except `interfaces`, which is updated
/// per interface name, key by key.
fn apply_fields(current: &mut Document, routed: Document) {
    for (key, value) in routed {
        match value {
            Value::Mapping(incoming) if key.as_str() == Some("interfaces") => {
                match current.get_mut(&key) {
                    Some(Value::Mapping(existing)) => merge_interfaces(existing, incoming),
                    _ => {
                        current.insert(key, Value::Mapping(incoming));
                    }
                }
            }
            value => {
                current.insert(key, value);
            }
        }
    }
}

fn merge_interfaces(existing: &mut Document, incoming: Document) {
    for (name, config) in incoming {
        match config {
            Value::Mapping(changes) => match existing.get_mut(&name) {
                Some(Value::Mapping(iface)) => {
                    for (k, v) in changes {
                        iface.insert(k, v);
                    }
                }
                _ => {
                    existing.insert(name, Value::Mapping(changes));
                }
            },
            config => {
                existing.insert(name, config);
            }
        }
    }
}
