//! The rich-text payload stored on documents.
//!
//! The tree never looks inside `Node::content`. Editors plug in through
//! [`ContentFormat`], which is only asked to decode, encode and project a
//! payload to plain text for word counting.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};

/// An editor's serialized document format.
pub trait ContentFormat {
    /// Editable in-memory form.
    type Doc;

    fn decode(&self, raw: &str) -> Result<Self::Doc>;
    fn encode(&self, doc: &Self::Doc) -> String;
    fn plain_text(&self, doc: &Self::Doc) -> String;
    fn empty(&self) -> Self::Doc;
}

/// Decode `raw` for editing. An unreadable payload is logged and replaced by
/// an empty document so the user can keep working; the next save overwrites it.
pub fn open_document<F: ContentFormat>(format: &F, raw: &str) -> F::Doc {
    if raw.trim().is_empty() {
        return format.empty();
    }
    match format.decode(raw) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!("Substituting empty document: {}", e);
            format.empty()
        }
    }
}

/// Plain-text projection of a stored payload.
pub fn plain_text_of<F: ContentFormat>(format: &F, raw: &str) -> String {
    format.plain_text(&open_document(format, raw))
}

/// A paragraph-level block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub key: String,
    pub text: String,
    #[serde(rename = "type", default = "default_block_type")]
    pub kind: String,
}

fn default_block_type() -> String {
    "unstyled".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockDocument {
    pub blocks: Vec<Block>,
}

/// Default format: `{"blocks": [{"key", "text", "type"}, ...]}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockFormat;

impl ContentFormat for BlockFormat {
    type Doc = BlockDocument;

    fn decode(&self, raw: &str) -> Result<BlockDocument> {
        serde_json::from_str(raw).map_err(|e| TreeError::ContentDecode(e.to_string()))
    }

    fn encode(&self, doc: &BlockDocument) -> String {
        serde_json::to_string(doc).unwrap_or_else(|_| "{\"blocks\":[]}".to_string())
    }

    fn plain_text(&self, doc: &BlockDocument) -> String {
        doc.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn empty(&self) -> BlockDocument {
        BlockDocument::default()
    }
}

/// A document rendered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentExport {
    pub filename: String,
    pub body: String,
}

/// Plain-text rendition of a single document: title, blank line, body.
pub fn document_text(name: &str, plain_text: &str) -> DocumentExport {
    let title = name.trim();
    let body = if plain_text.is_empty() {
        format!("{}\n", title)
    } else {
        format!("{}\n\n{}\n", title, plain_text.trim_end())
    };
    DocumentExport {
        filename: format!("{}.txt", sanitize_filename(title)),
        body,
    }
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}
