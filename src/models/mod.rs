//! Domain models for Quire.
//!
//! # Core Concepts
//!
//! - [`Node`]: An entry in the project outline. Either a [`NodeKind::Container`]
//!   (a project, part or folder that groups other nodes) or a
//!   [`NodeKind::Document`] (a chapter or scene holding rich-text content).
//! - [`Metadata`]: Writing-progress information carried by every node. The
//!   word count, completion percentage and reading time are derived from
//!   content and are never set directly.
//! - [`MetadataPatch`]: A typed partial update for the user-editable part of
//!   [`Metadata`].

mod metadata;
mod node;

pub use metadata::*;
pub use node::*;
