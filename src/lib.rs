//! Quire: outline and progress tracking for long-form writing projects.
//!
//! A project is a forest of containers (parts, folders) and documents
//! (chapters, scenes). The [`tree`] module holds the outline as an immutable
//! value with a small mutation algebra, [`progress`] derives word counts and
//! completion from document text, and [`workspace`] ties the live outline to
//! its durable snapshot in [`db`].

pub mod api;
pub mod codec;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod progress;
pub mod tree;
pub mod workspace;

pub use error::{Result, TreeError};
pub use tree::Forest;
pub use workspace::Workspace;
