//! ASCII outline rendering for the terminal.

use std::sync::Arc;

use crate::models::{Node, NodeKind, Status};

const NOT_STARTED: char = '○';
const IN_PROGRESS: char = '◐';
const COMPLETED: char = '●';
const CONTAINER: char = '▸';

/// Get the marker for a node: containers get a folder arrow, documents
/// their writing status.
fn marker(node: &Node) -> char {
    match node.kind {
        NodeKind::Container => CONTAINER,
        NodeKind::Document => match node.metadata.status {
            Status::NotStarted => NOT_STARTED,
            Status::InProgress => IN_PROGRESS,
            Status::Completed => COMPLETED,
        },
    }
}

/// Render an outline as ASCII art with status markers and word counts.
///
/// Example output:
/// ```text
/// The Long Road
/// ├── ▸ Part One
/// │   ├── ● Departure (2140 words)
/// │   └── ◐ Crossing (860 words)
/// └── ○ Epilogue (0 words)
/// ```
pub fn render_outline(roots: &[Arc<Node>]) -> String {
    let mut output = String::new();
    for (i, node) in roots.iter().enumerate() {
        let is_last = i == roots.len() - 1;
        render_node(&mut output, node, "", is_last, true);
    }
    output
}

fn render_node(output: &mut String, node: &Node, prefix: &str, is_last: bool, is_root: bool) {
    if is_root {
        output.push_str(&node.name);
    } else {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push(marker(node));
        output.push(' ');
        output.push_str(&node.name);
    }
    if node.is_document() {
        output.push_str(&format!(" ({} words)", node.metadata.actual_word_count));
    }
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}
