use thiserror::Error;

use crate::models::NodeId;

/// Errors raised by tree operations and the snapshot codec.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Node {0} is a document and cannot hold children")]
    NotAContainer(NodeId),

    #[error("Node {0} is a container and has no content")]
    NotADocument(NodeId),

    #[error("No node ids left above {0}")]
    IdsExhausted(NodeId),

    #[error("Index {index} out of range for a list of {len} siblings")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid snapshot: {0}")]
    Parse(String),

    #[error("Content could not be decoded: {0}")]
    ContentDecode(String),

    #[error("Failed to persist snapshot: {0}")]
    Persistence(String),
}

impl From<serde_json::Error> for TreeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

pub type Result<T, E = TreeError> = std::result::Result<T, E>;
