use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Metadata;

/// Forest-wide node identifier, derived from the creation time in milliseconds.
pub type NodeId = u64;

/// Largest id a node may carry; the id floor is stored as a signed SQLite
/// integer.
pub const MAX_NODE_ID: NodeId = i64::MAX as NodeId;

/// Whether a node groups other nodes or holds writing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A project, part or folder. May hold containers and documents.
    Container,
    /// A chapter or scene. Always a leaf.
    Document,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Document => "document",
        }
    }
}

/// An entry in the outline.
///
/// Children are shared behind [`Arc`] so that replacing one node only copies
/// the path from the root down to it; untouched subtrees are reused between
/// successive forest values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<Arc<Node>>,
    /// Opaque rich-text payload. Only documents carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub metadata: Metadata,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            children: Vec::new(),
            content: match kind {
                NodeKind::Document => Some(String::new()),
                NodeKind::Container => None,
            },
            metadata: Metadata::new(now),
        }
    }

    pub fn is_container(&self) -> bool {
        self.kind == NodeKind::Container
    }

    pub fn is_document(&self) -> bool {
        self.kind == NodeKind::Document
    }

    /// Depth-first, pre-order walk over this node and its descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Input for creating a new node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeInput {
    /// Parent container. `None` creates a root node.
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    pub kind: NodeKind,
    pub name: String,
}

/// Input for renaming a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameNodeInput {
    pub name: String,
}

/// Input for saving a document's content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContentInput {
    /// Serialized editor state, stored verbatim.
    pub content: String,
    /// Plain-text projection used for word counting. When absent the
    /// default block format is used to derive it from `content`.
    #[serde(default)]
    pub plain_text: Option<String>,
}

/// Input for moving a node within its sibling list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderInput {
    /// Parent whose children are reordered. `None` reorders the roots.
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    pub source_index: usize,
    pub dest_index: usize,
}
