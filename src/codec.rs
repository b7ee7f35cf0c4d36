//! Portable snapshot format used for backups, import and the on-disk slot.
//!
//! A snapshot is a JSON array of root nodes, each carrying
//! `id, name, kind, children, content?, metadata`, in outline order.

use std::sync::Arc;

use crate::error::{Result, TreeError};
use crate::models::Node;
use crate::tree::Forest;

/// Default file name offered when downloading an export.
pub const EXPORT_FILENAME: &str = "scrivener_projects.json";

/// Serialize the whole forest, preserving order.
pub fn export(forest: &Forest) -> Result<String> {
    Ok(serde_json::to_string_pretty(forest)?)
}

/// Parse and validate a snapshot.
///
/// Nothing is returned unless the whole text is valid, so a failed import
/// can never be partially applied.
pub fn import(text: &str) -> Result<Forest> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let roots: Vec<Arc<Node>> = serde_json::from_str(text)?;
    Forest::from_roots(roots)
}

/// [`import`] for raw file bytes, which must be UTF-8.
pub fn import_bytes(bytes: &[u8]) -> Result<Forest> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| TreeError::Parse(format!("snapshot is not UTF-8: {}", e)))?;
    import(text)
}
