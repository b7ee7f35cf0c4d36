//! Drag-and-drop reordering within a single sibling list.
//!
//! Moves never cross parents: the drag surface only offers destinations in
//! the same list as the source, so a reorder is always a permutation of one
//! parent's children (or of the roots).

use crate::models::NodeId;

use super::Forest;

/// Identifies one sibling list in the outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// The root list.
    Root,
    /// The children of a container.
    Children(NodeId),
}

impl From<Option<NodeId>> for Level {
    fn from(parent: Option<NodeId>) -> Self {
        match parent {
            None => Self::Root,
            Some(id) => Self::Children(id),
        }
    }
}

/// Length of the sibling list at `level`, or `None` if its parent is unknown.
///
/// Callers use this to validate indices before calling [`on_reorder`].
pub fn sibling_count(forest: &Forest, level: Level) -> Option<usize> {
    match level {
        Level::Root => forest.children_of(None).map(<[_]>::len),
        Level::Children(id) => forest.children_of(Some(id)).map(<[_]>::len),
    }
}

/// Move the element at `from` so that it ends up at `to`, shifting the
/// elements in between by one and keeping everyone else in order.
///
/// # Panics
///
/// Panics if either index is outside `list`.
pub fn move_within<T>(list: &mut Vec<T>, from: usize, to: usize) {
    assert!(
        from < list.len() && to < list.len(),
        "reorder indices ({from}, {to}) out of range for list of length {}",
        list.len()
    );
    let item = list.remove(from);
    list.insert(to, item);
}

/// Apply a drag from `source` to `dest` within the list at `level`.
///
/// An unknown parent leaves the forest unchanged.
///
/// # Panics
///
/// Panics if `source` or `dest` is out of range for the list; indices are
/// expected to be validated against [`sibling_count`] first.
pub fn on_reorder(forest: &Forest, level: Level, source: usize, dest: usize) -> Forest {
    let parent_path = match level {
        Level::Root => Vec::new(),
        Level::Children(id) => match forest.path_of(id) {
            Some(path) => path.to_vec(),
            None => {
                tracing::warn!(id, "reorder under unknown parent ignored");
                return forest.clone();
            }
        },
    };

    if source == dest {
        let len = sibling_count(forest, level).unwrap_or(0);
        assert!(source < len, "reorder index {source} out of range for list of length {len}");
        return forest.clone();
    }

    tracing::debug!(?level, source, dest, "reordering siblings");
    forest.permute_siblings(
        &parent_path,
        |list| move_within(list, source, dest),
        source.min(dest),
    )
}
