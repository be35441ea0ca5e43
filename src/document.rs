//! Document store: read and write one YAML document on disk.
//!
//! Missing files read as `None` (or an empty mapping through [`load`]); a file
//! that exists but does not parse is always an error. Writes go to a sibling
//! temp file that is renamed over the target, so readers never observe a
//! half-written document. Parent directories are created as needed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::GatecfgError;
use crate::types::Document;

/// Pure function: parse document text. Empty text and a bare `null` both
/// produce an empty mapping.
pub fn parse_document(path: &Path, content: &str) -> Result<Document, GatecfgError> {
    if content.trim().is_empty() {
        return Ok(Document::new());
    }
    let value: Value = serde_yaml::from_str(content).map_err(|source| GatecfgError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Null => Ok(Document::new()),
        Value::Mapping(map) => Ok(map),
        _ => Err(GatecfgError::NotAMapping {
            path: path.to_path_buf(),
            key: "<root>".into(),
        }),
    }
}

/// Pure function: render a document as block-style YAML.
pub fn render_document(path: &Path, doc: &Document) -> Result<String, GatecfgError> {
    if doc.is_empty() {
        return Ok(String::new());
    }
    serde_yaml::to_string(doc).map_err(|source| GatecfgError::Serialize {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a document, distinguishing "absent" (`None`) from "present".
pub fn load_optional(path: &Path) -> Result<Option<Document>, GatecfgError> {
    match fs::read_to_string(path) {
        Ok(content) => parse_document(path, &content).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(GatecfgError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Read a document; an absent file is an empty mapping.
pub fn load(path: &Path) -> Result<Document, GatecfgError> {
    Ok(load_optional(path)?.unwrap_or_default())
}

/// Persist a document atomically, creating parent directories.
pub fn save(path: &Path, doc: &Document) -> Result<(), GatecfgError> {
    let rendered = render_document(path, doc)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| GatecfgError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp_path = temp_path_for(path);
    fs::write(&temp_path, rendered).map_err(|e| GatecfgError::Io {
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        GatecfgError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    tracing::info!(path = %path.display(), keys = doc.len(), "persisted config document");
    Ok(())
}

/// `<dir>/.<file_name>.<pid>.tmp`, in the target's own directory so the
/// rename never crosses filesystems.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".into());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}
