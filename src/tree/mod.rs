//! The outline as an immutable value.
//!
//! A [`Forest`] is never edited in place. Every operation returns a new
//! forest that shares all untouched subtrees with the old one, so a reader
//! holding the previous value never sees a half-applied change.
//!
//! Lookups go through an id → path index (child positions from the root
//! list down to the node), making them O(depth). Operations that only
//! replace a node's fields reuse the index as-is; structural operations
//! (create, delete, reorder) rewrite only the entries whose path changed.

pub mod render;
pub mod reorder;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::{Result, TreeError};
use crate::models::{MetadataPatch, Node, NodeId, NodeKind, MAX_NODE_ID};
use crate::progress;

/// Child positions leading from the root list to a node.
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, Default)]
pub struct Forest {
    roots: Vec<Arc<Node>>,
    index: Arc<HashMap<NodeId, NodePath>>,
    /// Largest id ever issued or loaded; new ids are always above it.
    high_water: NodeId,
}

impl PartialEq for Forest {
    fn eq(&self, other: &Self) -> bool {
        self.roots == other.roots
    }
}

impl Serialize for Forest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.roots.serialize(serializer)
    }
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a forest from already-parsed root nodes, checking that ids are
    /// unique and that each node's kind matches its shape.
    pub fn from_roots(roots: Vec<Arc<Node>>) -> Result<Self> {
        let mut index = HashMap::new();
        let mut high_water = 0;
        for (i, root) in roots.iter().enumerate() {
            validate_subtree(root, vec![i], &mut index, &mut high_water)?;
        }
        Ok(Self {
            roots,
            index: Arc::new(index),
            high_water,
        })
    }

    pub fn roots(&self) -> &[Arc<Node>] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes at every depth.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn path_of(&self, id: NodeId) -> Option<&[usize]> {
        self.index.get(&id).map(Vec::as_slice)
    }

    pub fn get(&self, id: NodeId) -> Option<&Arc<Node>> {
        let path = self.index.get(&id)?;
        node_at(&self.roots, path)
    }

    /// The sibling list owned by `parent`, or the root list for `None`.
    /// Returns `None` when the parent is unknown.
    pub fn children_of(&self, parent: Option<NodeId>) -> Option<&[Arc<Node>]> {
        match parent {
            None => Some(&self.roots),
            Some(id) => self.get(id).map(|n| n.children.as_slice()),
        }
    }

    /// Largest id this forest has issued or contained.
    pub fn high_water(&self) -> NodeId {
        self.high_water
    }

    /// Raise the id floor so ids up to `high_water` are never issued again,
    /// even if the nodes carrying them are gone.
    pub fn with_high_water(mut self, high_water: NodeId) -> Self {
        self.high_water = self.high_water.max(high_water.min(MAX_NODE_ID));
        self
    }

    fn next_id(&self, now: DateTime<Utc>) -> Result<NodeId> {
        let floor = self
            .high_water
            .checked_add(1)
            .filter(|id| *id <= MAX_NODE_ID)
            .ok_or(TreeError::IdsExhausted(self.high_water))?;
        let stamp = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        Ok(stamp.clamp(floor, MAX_NODE_ID))
    }

    // ============================================================
    // Operations
    // ============================================================

    /// Append a new node to `parent`'s children, or to the roots for `None`.
    pub fn create(
        &self,
        parent: Option<NodeId>,
        kind: NodeKind,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(Forest, NodeId)> {
        let parent_path: NodePath = match parent {
            None => Vec::new(),
            Some(pid) => {
                let path = self.index.get(&pid).ok_or(TreeError::NotFound(pid))?;
                let parent_node = node_at(&self.roots, path).ok_or(TreeError::NotFound(pid))?;
                if !parent_node.is_container() {
                    return Err(TreeError::NotAContainer(pid));
                }
                path.clone()
            }
        };

        let id = self.next_id(now)?;
        let node = Arc::new(Node::new(id, kind, name, now));
        let mut position = 0;
        let roots = with_siblings(&self.roots, &parent_path, |list| {
            position = list.len();
            list.push(node);
        });

        let mut index = self.index.clone();
        let mut path = parent_path;
        path.push(position);
        Arc::make_mut(&mut index).insert(id, path);

        tracing::debug!(id, ?parent, kind = kind.as_str(), "created node");
        Ok((
            Forest {
                roots,
                index,
                high_water: id,
            },
            id,
        ))
    }

    /// Remove a node together with its whole subtree. Unknown ids are a no-op.
    pub fn delete(&self, id: NodeId) -> Forest {
        let Some(path) = self.index.get(&id) else {
            tracing::warn!(id, "delete of unknown node ignored");
            return self.clone();
        };
        let (parent_path, position) = split_path(path);

        let mut removed = None;
        let roots = with_siblings(&self.roots, parent_path, |list| {
            removed = Some(list.remove(position));
        });

        let mut index = self.index.clone();
        let entries = Arc::make_mut(&mut index);
        if let Some(removed) = removed {
            removed.walk(&mut |n| {
                entries.remove(&n.id);
            });
        }
        let siblings = sibling_list(&roots, parent_path);
        reindex_siblings(entries, parent_path, siblings, position);

        tracing::debug!(id, "deleted node");
        Forest {
            roots,
            index,
            high_water: self.high_water,
        }
    }

    /// Change a node's display name. Metadata, including `last_modified`,
    /// is left alone.
    pub fn rename(&self, id: NodeId, name: &str) -> Forest {
        self.replace(id, |node| {
            Ok(Node {
                name: name.to_string(),
                ..node.clone()
            })
        })
        .unwrap_or_else(|_| self.clone())
    }

    /// Store new content for a document and refresh its derived metadata.
    pub fn update_content(
        &self,
        id: NodeId,
        content: &str,
        plain_text: &str,
        now: DateTime<Utc>,
    ) -> Result<Forest> {
        self.replace(id, |node| {
            if !node.is_document() {
                return Err(TreeError::NotADocument(id));
            }
            Ok(Node {
                content: Some(content.to_string()),
                metadata: progress::derive_on_save(&node.metadata, plain_text, now),
                ..node.clone()
            })
        })
    }

    /// Merge the present fields of `patch` into a node's metadata.
    ///
    /// A new goal refreshes `completion_percentage` from the stored word
    /// count; the word count and reading time are not touched.
    pub fn update_metadata(&self, id: NodeId, patch: &MetadataPatch, now: DateTime<Utc>) -> Forest {
        if patch.is_empty() {
            return self.clone();
        }
        self.replace(id, |node| {
            let mut metadata = node.metadata.clone();
            if let Some(status) = patch.status {
                metadata.status = status;
            }
            if let Some(goal) = patch.word_count_goal {
                metadata.word_count_goal = goal;
                metadata.completion_percentage =
                    progress::completion_percentage(metadata.actual_word_count, goal);
            }
            if let Some(tags) = &patch.tags {
                metadata.tags = tags.clone();
            }
            if let Some(author) = &patch.author {
                metadata.author = author.clone();
            }
            if let Some(version) = &patch.version {
                metadata.version = version.clone();
            }
            metadata.last_modified = now;
            Ok(Node {
                metadata,
                ..node.clone()
            })
        })
        .unwrap_or_else(|_| self.clone())
    }

    /// Move the child at `source` to `dest` within `parent`'s children.
    pub fn move_node(&self, parent: Option<NodeId>, source: usize, dest: usize) -> Forest {
        reorder::on_reorder(self, parent.into(), source, dest)
    }

    /// Replace the node `id` with the result of `update`, copying only the
    /// path from the root down to it. Unknown ids return the forest unchanged.
    fn replace(&self, id: NodeId, update: impl FnOnce(&Node) -> Result<Node>) -> Result<Forest> {
        let Some(path) = self.index.get(&id) else {
            tracing::warn!(id, "update of unknown node ignored");
            return Ok(self.clone());
        };
        let (parent_path, position) = split_path(path);

        let current = sibling_list(&self.roots, parent_path)[position].clone();
        let updated = Arc::new(update(&current)?);
        let roots = with_siblings(&self.roots, parent_path, |list| {
            list[position] = updated;
        });

        Ok(Forest {
            roots,
            index: self.index.clone(),
            high_water: self.high_water,
        })
    }

    /// Permute one sibling list and refresh the affected index entries.
    fn permute_siblings(
        &self,
        parent_path: &[usize],
        permute: impl FnOnce(&mut Vec<Arc<Node>>),
        first_changed: usize,
    ) -> Forest {
        let roots = with_siblings(&self.roots, parent_path, permute);
        let mut index = self.index.clone();
        let siblings = sibling_list(&roots, parent_path);
        reindex_siblings(Arc::make_mut(&mut index), parent_path, siblings, first_changed);
        Forest {
            roots,
            index,
            high_water: self.high_water,
        }
    }
}

// ============================================================
// Path helpers
// ============================================================

fn split_path(path: &[usize]) -> (&[usize], usize) {
    let (last, parent) = path
        .split_last()
        .expect("indexed paths are never empty");
    (parent, *last)
}

fn node_at<'a>(roots: &'a [Arc<Node>], path: &[usize]) -> Option<&'a Arc<Node>> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.get(*first)?;
    for &i in rest {
        node = node.children.get(i)?;
    }
    Some(node)
}

/// The sibling list at `parent_path`; the root list for an empty path.
fn sibling_list<'a>(roots: &'a [Arc<Node>], parent_path: &[usize]) -> &'a [Arc<Node>] {
    match node_at(roots, parent_path) {
        Some(parent) => &parent.children,
        None => roots,
    }
}

/// Rebuild the spine down to `parent_path`, applying `edit` to the sibling
/// list found there. Everything off the spine is shared.
fn with_siblings(
    list: &[Arc<Node>],
    parent_path: &[usize],
    edit: impl FnOnce(&mut Vec<Arc<Node>>),
) -> Vec<Arc<Node>> {
    let mut list = list.to_vec();
    match parent_path.split_first() {
        None => edit(&mut list),
        Some((&i, rest)) => {
            let mut node = (*list[i]).clone();
            node.children = with_siblings(&node.children, rest, edit);
            list[i] = Arc::new(node);
        }
    }
    list
}

/// Rewrite index paths for `siblings[from..]` and all their descendants.
fn reindex_siblings(
    index: &mut HashMap<NodeId, NodePath>,
    parent_path: &[usize],
    siblings: &[Arc<Node>],
    from: usize,
) {
    for (i, node) in siblings.iter().enumerate().skip(from) {
        let mut path = parent_path.to_vec();
        path.push(i);
        index_subtree(index, node, path);
    }
}

fn index_subtree(index: &mut HashMap<NodeId, NodePath>, node: &Node, path: NodePath) {
    for (i, child) in node.children.iter().enumerate() {
        let mut child_path = path.clone();
        child_path.push(i);
        index_subtree(index, child, child_path);
    }
    index.insert(node.id, path);
}

fn validate_subtree(
    node: &Node,
    path: NodePath,
    index: &mut HashMap<NodeId, NodePath>,
    high_water: &mut NodeId,
) -> Result<()> {
    if node.id > MAX_NODE_ID {
        return Err(TreeError::Parse(format!(
            "node id {} exceeds the maximum of {}",
            node.id, MAX_NODE_ID
        )));
    }
    match node.kind {
        NodeKind::Document if !node.children.is_empty() => {
            return Err(TreeError::Parse(format!(
                "document {} must not have children",
                node.id
            )));
        }
        NodeKind::Container if node.content.is_some() => {
            return Err(TreeError::Parse(format!(
                "container {} must not carry content",
                node.id
            )));
        }
        _ => {}
    }
    for (i, child) in node.children.iter().enumerate() {
        let mut child_path = path.clone();
        child_path.push(i);
        validate_subtree(child, child_path, index, high_water)?;
    }
    if index.insert(node.id, path).is_some() {
        return Err(TreeError::Parse(format!("duplicate node id {}", node.id)));
    }
    *high_water = (*high_water).max(node.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use chrono::Duration;

    /// Novel
    /// ├── Part One
    /// │   ├── Chapter 1
    /// │   └── Chapter 2
    /// └── Notes
    /// Essays
    fn sample() -> (Forest, Vec<NodeId>) {
        let now = Utc::now();
        let f = Forest::new();
        let (f, novel) = f.create(None, NodeKind::Container, "Novel", now).unwrap();
        let (f, part) = f.create(Some(novel), NodeKind::Container, "Part One", now).unwrap();
        let (f, ch1) = f.create(Some(part), NodeKind::Document, "Chapter 1", now).unwrap();
        let (f, ch2) = f.create(Some(part), NodeKind::Document, "Chapter 2", now).unwrap();
        let (f, notes) = f.create(Some(novel), NodeKind::Document, "Notes", now).unwrap();
        let (f, essays) = f.create(None, NodeKind::Container, "Essays", now).unwrap();
        (f, vec![novel, part, ch1, ch2, notes, essays])
    }

    fn names(list: &[Arc<Node>]) -> Vec<&str> {
        list.iter().map(|n| n.name.as_str()).collect()
    }

    fn assert_index_consistent(f: &Forest) {
        let mut seen = 0;
        for root in f.roots() {
            root.walk(&mut |n| {
                seen += 1;
                assert_eq!(f.get(n.id).map(|found| found.id), Some(n.id));
            });
        }
        assert_eq!(seen, f.len());
    }

    #[test]
    fn create_appends_with_unique_increasing_ids() {
        let (f, ids) = sample();
        assert_eq!(f.len(), 6);
        assert_eq!(names(f.roots()), vec!["Novel", "Essays"]);
        let part = f.get(ids[1]).unwrap();
        assert_eq!(names(&part.children), vec!["Chapter 1", "Chapter 2"]);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_index_consistent(&f);
    }

    #[test]
    fn create_defaults_content_by_kind() {
        let (f, ids) = sample();
        assert_eq!(f.get(ids[2]).unwrap().content.as_deref(), Some(""));
        assert!(f.get(ids[0]).unwrap().content.is_none());
    }

    #[test]
    fn create_under_unknown_parent_fails() {
        let (f, _) = sample();
        let err = f.create(Some(42), NodeKind::Document, "x", Utc::now()).unwrap_err();
        assert!(matches!(err, TreeError::NotFound(42)));
    }

    #[test]
    fn create_under_document_fails() {
        let (f, ids) = sample();
        let err = f.create(Some(ids[2]), NodeKind::Document, "x", Utc::now()).unwrap_err();
        assert!(matches!(err, TreeError::NotAContainer(_)));
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let (f, ids) = sample();
        let last = *ids.last().unwrap();
        let f = f.delete(last);
        let (_, fresh) = f
            .create(None, NodeKind::Container, "Again", Utc::now() - Duration::days(1))
            .unwrap();
        assert!(fresh > last);
    }

    #[test]
    fn delete_removes_subtree_and_reindexes_siblings() {
        let (f, ids) = sample();
        let after = f.delete(ids[1]);
        assert_eq!(after.len(), 3);
        assert!(!after.contains(ids[1]));
        assert!(!after.contains(ids[2]));
        assert!(!after.contains(ids[3]));
        assert_eq!(after.path_of(ids[4]), Some(&[0usize, 0][..]));
        assert_index_consistent(&after);
        // The original value is untouched.
        assert_eq!(f.len(), 6);
    }

    #[test]
    fn delete_unknown_is_noop() {
        let (f, _) = sample();
        assert_eq!(f.delete(7), f);
    }

    #[test]
    fn untouched_subtrees_are_shared() {
        let (f, ids) = sample();
        let after = f.rename(ids[2], "Opening");
        assert!(Arc::ptr_eq(&f.roots()[1], &after.roots()[1]));
        assert!(Arc::ptr_eq(f.get(ids[3]).unwrap(), after.get(ids[3]).unwrap()));
        assert!(!Arc::ptr_eq(&f.roots()[0], &after.roots()[0]));
    }

    #[test]
    fn rename_leaves_metadata_alone() {
        let (f, ids) = sample();
        let before = f.get(ids[2]).unwrap().clone();
        let after = f.rename(ids[2], "Opening");
        let renamed = after.get(ids[2]).unwrap();
        assert_eq!(renamed.name, "Opening");
        assert_eq!(renamed.metadata, before.metadata);
        assert_eq!(renamed.content, before.content);
    }

    #[test]
    fn update_content_derives_metadata() {
        let (f, ids) = sample();
        let f = f.update_metadata(
            ids[2],
            &MetadataPatch {
                word_count_goal: Some(2000),
                ..Default::default()
            },
            Utc::now(),
        );
        let text = vec!["word"; 500].join(" ");
        let later = Utc::now() + Duration::seconds(1);
        let f = f.update_content(ids[2], "{\"blocks\":[]}", &text, later).unwrap();
        let node = f.get(ids[2]).unwrap();
        assert_eq!(node.content.as_deref(), Some("{\"blocks\":[]}"));
        assert_eq!(node.metadata.actual_word_count, 500);
        assert_eq!(node.metadata.estimated_reading_time, 2);
        assert_eq!(node.metadata.completion_percentage, 25.0);
        assert_eq!(node.metadata.last_modified, later);
    }

    #[test]
    fn update_content_rejects_containers() {
        let (f, ids) = sample();
        let err = f.update_content(ids[0], "x", "x", Utc::now()).unwrap_err();
        assert!(matches!(err, TreeError::NotADocument(_)));
    }

    #[test]
    fn update_content_on_unknown_id_is_noop() {
        let (f, _) = sample();
        assert_eq!(f.update_content(3, "x", "x", Utc::now()).unwrap(), f);
    }

    #[test]
    fn update_metadata_merges_present_fields() {
        let (f, ids) = sample();
        let later = Utc::now() + Duration::seconds(1);
        let f = f.update_metadata(
            ids[2],
            &MetadataPatch {
                status: Some(Status::InProgress),
                author: Some("Ann".to_string()),
                ..Default::default()
            },
            later,
        );
        let f = f.update_metadata(
            ids[2],
            &MetadataPatch {
                version: Some("2.0".to_string()),
                ..Default::default()
            },
            later,
        );
        let meta = &f.get(ids[2]).unwrap().metadata;
        assert_eq!(meta.status, Status::InProgress);
        assert_eq!(meta.author, "Ann");
        assert_eq!(meta.version, "2.0");
        assert_eq!(meta.last_modified, later);
        assert!(meta.creation_date < later);
    }

    #[test]
    fn goal_change_refreshes_completion() {
        let (f, ids) = sample();
        let text = vec!["word"; 300].join(" ");
        let f = f.update_content(ids[2], "c", &text, Utc::now()).unwrap();
        let f = f.update_metadata(
            ids[2],
            &MetadataPatch {
                word_count_goal: Some(600),
                ..Default::default()
            },
            Utc::now(),
        );
        let meta = &f.get(ids[2]).unwrap().metadata;
        assert_eq!(meta.completion_percentage, 50.0);
        assert_eq!(meta.actual_word_count, 300);
    }

    #[test]
    fn from_roots_rejects_duplicate_ids() {
        let now = Utc::now();
        let a = Arc::new(Node::new(1, NodeKind::Container, "a", now));
        let b = Arc::new(Node::new(1, NodeKind::Container, "b", now));
        assert!(matches!(
            Forest::from_roots(vec![a, b]),
            Err(TreeError::Parse(_))
        ));
    }

    #[test]
    fn from_roots_rejects_documents_with_children() {
        let now = Utc::now();
        let mut doc = Node::new(1, NodeKind::Document, "a", now);
        doc.children.push(Arc::new(Node::new(2, NodeKind::Document, "b", now)));
        assert!(matches!(
            Forest::from_roots(vec![Arc::new(doc)]),
            Err(TreeError::Parse(_))
        ));
    }

    #[test]
    fn from_roots_rejects_ids_beyond_the_maximum() {
        let now = Utc::now();
        let root = Arc::new(Node::new(u64::MAX, NodeKind::Container, "a", now));
        assert!(matches!(
            Forest::from_roots(vec![root]),
            Err(TreeError::Parse(_))
        ));
    }

    #[test]
    fn create_reports_exhausted_ids() {
        let now = Utc::now();
        let root = Arc::new(Node::new(MAX_NODE_ID, NodeKind::Container, "a", now));
        let forest = Forest::from_roots(vec![root]).unwrap();
        assert!(matches!(
            forest.create(Some(MAX_NODE_ID), NodeKind::Document, "b", now),
            Err(TreeError::IdsExhausted(MAX_NODE_ID))
        ));
    }

    #[test]
    fn next_id_stays_above_the_floor() {
        let now = Utc::now();
        let root = Arc::new(Node::new(MAX_NODE_ID - 1, NodeKind::Container, "a", now));
        let forest = Forest::from_roots(vec![root]).unwrap();
        let (_, id) = forest.create(None, NodeKind::Document, "b", now).unwrap();
        assert_eq!(id, MAX_NODE_ID);
    }
}
