//! The live outline and its persistence lifecycle.
//!
//! [`Workspace`] owns the current [`Forest`] and is its only writer. Each
//! mutation computes a new forest, writes it to the snapshot slot, and only
//! then makes it current; a failed write leaves the previous forest in place.
//! Readers take an `Arc<Forest>` and keep a consistent view for as long as
//! they hold it.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::codec;
use crate::content::{self, BlockFormat, DocumentExport};
use crate::db::Database;
use crate::error::{Result, TreeError};
use crate::models::*;
use crate::progress::{self, ProgressSummary};
use crate::tree::reorder::{self, Level};
use crate::tree::Forest;

pub struct Workspace {
    db: Database,
    current: Arc<Mutex<Arc<Forest>>>,
}

impl Workspace {
    /// Open a workspace over `db`, loading whatever snapshot it holds.
    pub fn open(db: Database) -> Self {
        let forest = db.load_snapshot();
        Self {
            db,
            current: Arc::new(Mutex::new(Arc::new(forest))),
        }
    }

    /// The current outline.
    pub fn forest(&self) -> Arc<Forest> {
        self.current.lock().expect("workspace lock poisoned").clone()
    }

    pub fn get(&self, id: NodeId) -> Option<Arc<Node>> {
        self.forest().get(id).cloned()
    }

    // ============================================================
    // Mutations
    // ============================================================

    pub fn create(&self, input: CreateNodeInput) -> Result<Arc<Node>> {
        let mut current = self.current.lock().expect("workspace lock poisoned");
        let (next, id) = current.create(input.parent_id, input.kind, &input.name, Utc::now())?;
        self.persist(&next)?;
        let node = next.get(id).cloned().ok_or(TreeError::NotFound(id))?;
        *current = Arc::new(next);
        tracing::info!(id, name = %node.name, "created {}", node.kind.as_str());
        Ok(node)
    }

    /// Delete a node and its subtree. Returns whether it existed.
    pub fn delete(&self, id: NodeId) -> Result<bool> {
        let mut current = self.current.lock().expect("workspace lock poisoned");
        if !current.contains(id) {
            tracing::warn!(id, "delete of unknown node ignored");
            return Ok(false);
        }
        let next = current.delete(id);
        self.persist(&next)?;
        *current = Arc::new(next);
        tracing::info!(id, "deleted node");
        Ok(true)
    }

    pub fn rename(&self, id: NodeId, name: &str) -> Result<Option<Arc<Node>>> {
        self.apply_to_node(id, |f| Ok(f.rename(id, name)))
    }

    /// Save a document's content. Without an explicit plain-text projection
    /// the content is read as [`BlockFormat`].
    pub fn update_content(&self, id: NodeId, input: UpdateContentInput) -> Result<Option<Arc<Node>>> {
        let plain_text = match input.plain_text {
            Some(text) => text,
            None => content::plain_text_of(&BlockFormat, &input.content),
        };
        self.apply_to_node(id, |f| {
            f.update_content(id, &input.content, &plain_text, Utc::now())
        })
    }

    pub fn update_metadata(&self, id: NodeId, patch: &MetadataPatch) -> Result<Option<Arc<Node>>> {
        self.apply_to_node(id, |f| Ok(f.update_metadata(id, patch, Utc::now())))
    }

    /// Reorder one sibling list, rejecting indices the list cannot hold.
    /// Returns `None` when the parent is unknown.
    pub fn reorder(&self, input: &ReorderInput) -> Result<Option<Arc<Forest>>> {
        let mut current = self.current.lock().expect("workspace lock poisoned");
        let level = Level::from(input.parent_id);
        let Some(len) = reorder::sibling_count(&current, level) else {
            tracing::warn!(?level, "reorder under unknown parent ignored");
            return Ok(None);
        };
        for index in [input.source_index, input.dest_index] {
            if index >= len {
                return Err(TreeError::IndexOutOfRange { index, len });
            }
        }
        if input.source_index == input.dest_index {
            return Ok(Some(current.clone()));
        }

        let next = reorder::on_reorder(&current, level, input.source_index, input.dest_index);
        self.persist(&next)?;
        let next = Arc::new(next);
        *current = next.clone();
        Ok(Some(next))
    }

    /// Replace the whole outline with an imported snapshot. Invalid text is
    /// rejected before anything changes.
    pub fn import(&self, text: &str) -> Result<Arc<Forest>> {
        let imported = codec::import(text)?;
        self.replace_all(imported)
    }

    pub fn import_bytes(&self, bytes: &[u8]) -> Result<Arc<Forest>> {
        let imported = codec::import_bytes(bytes)?;
        self.replace_all(imported)
    }

    /// Erase the stored snapshot and start over with an empty outline.
    pub fn clear(&self) -> Result<()> {
        let mut current = self.current.lock().expect("workspace lock poisoned");
        self.db
            .clear_snapshot()
            .map_err(|e| TreeError::Persistence(e.to_string()))?;
        *current = Arc::new(Forest::new().with_high_water(current.high_water()));
        tracing::info!("cleared workspace");
        Ok(())
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn export(&self) -> Result<String> {
        codec::export(&self.forest())
    }

    /// When the outline was last written to storage.
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.db
            .saved_at()
            .map_err(|e| TreeError::Persistence(e.to_string()))
    }

    pub fn progress(&self, id: NodeId) -> Option<ProgressSummary> {
        self.get(id).map(|node| progress::rollup(&node))
    }

    /// Plain-text download of a single document.
    pub fn document_export(&self, id: NodeId) -> Result<Option<DocumentExport>> {
        let Some(node) = self.get(id) else {
            return Ok(None);
        };
        if !node.is_document() {
            return Err(TreeError::NotADocument(id));
        }
        let raw = node.content.as_deref().unwrap_or_default();
        let plain_text = content::plain_text_of(&BlockFormat, raw);
        Ok(Some(content::document_text(&node.name, &plain_text)))
    }

    // ============================================================
    // Helpers
    // ============================================================

    fn apply_to_node(
        &self,
        id: NodeId,
        op: impl FnOnce(&Forest) -> Result<Forest>,
    ) -> Result<Option<Arc<Node>>> {
        let mut current = self.current.lock().expect("workspace lock poisoned");
        if !current.contains(id) {
            tracing::warn!(id, "update of unknown node ignored");
            return Ok(None);
        }
        let next = op(&current)?;
        self.persist(&next)?;
        let node = next.get(id).cloned();
        *current = Arc::new(next);
        Ok(node)
    }

    fn replace_all(&self, forest: Forest) -> Result<Arc<Forest>> {
        let mut current = self.current.lock().expect("workspace lock poisoned");
        let forest = forest.with_high_water(current.high_water());
        self.persist(&forest)?;
        let forest = Arc::new(forest);
        *current = forest.clone();
        tracing::info!(nodes = forest.len(), "replaced outline from import");
        Ok(forest)
    }

    fn persist(&self, forest: &Forest) -> Result<()> {
        self.db.save_snapshot(forest).map_err(|e| {
            tracing::error!("Failed to save snapshot: {}", e);
            TreeError::Persistence(e.to_string())
        })
    }
}

impl Clone for Workspace {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            current: self.current.clone(),
        }
    }
}
