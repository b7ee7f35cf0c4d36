//! Writing-progress derivation: word counts, reading time and completion.
//!
//! Everything here is a pure function of plain text and existing metadata.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Metadata, Node, Status};

/// Average adult silent-reading speed used for estimates.
pub const WORDS_PER_MINUTE: u32 = 250;

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Count whitespace-separated words after stripping `<...>` markup.
///
/// Empty or whitespace-only input counts as zero words.
pub fn count_words(plain_text: &str) -> u32 {
    let stripped = MARKUP.replace_all(plain_text, "");
    let count = stripped.split_whitespace().count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Reading time in whole minutes, rounded up.
pub fn estimate_reading_time(word_count: u32) -> u32 {
    word_count.div_ceil(WORDS_PER_MINUTE)
}

/// `words / goal * 100` clamped to `[0, 100]` and rounded to two decimals.
/// A zero goal yields `0`.
pub fn completion_percentage(word_count: u32, goal: u32) -> f64 {
    if goal == 0 {
        return 0.0;
    }
    let pct = (f64::from(word_count) / f64::from(goal) * 100.0).clamp(0.0, 100.0);
    (pct * 100.0).round() / 100.0
}

/// Recompute the derived fields for freshly saved content.
///
/// Word count, completion and reading time are replaced together and
/// `last_modified` is set to `now`; every other field is carried over.
pub fn derive_on_save(existing: &Metadata, plain_text: &str, now: DateTime<Utc>) -> Metadata {
    let words = count_words(plain_text);
    Metadata {
        actual_word_count: words,
        completion_percentage: completion_percentage(words, existing.word_count_goal),
        estimated_reading_time: estimate_reading_time(words),
        last_modified: now,
        ..existing.clone()
    }
}

/// Document counts per status within a subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
}

/// Aggregated progress over every document below (and including) a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub documents: usize,
    pub word_count: u32,
    pub word_count_goal: u32,
    pub completion_percentage: f64,
    pub estimated_reading_time: u32,
    pub by_status: StatusCounts,
}

/// Roll up document progress for a subtree. Container metadata is ignored.
pub fn rollup(node: &Node) -> ProgressSummary {
    let mut documents = 0usize;
    let mut words = 0u32;
    let mut goal = 0u32;
    let mut by_status = StatusCounts::default();

    node.walk(&mut |n| {
        if !n.is_document() {
            return;
        }
        documents += 1;
        words = words.saturating_add(n.metadata.actual_word_count);
        goal = goal.saturating_add(n.metadata.word_count_goal);
        match n.metadata.status {
            Status::NotStarted => by_status.not_started += 1,
            Status::InProgress => by_status.in_progress += 1,
            Status::Completed => by_status.completed += 1,
        }
    });

    ProgressSummary {
        documents,
        word_count: words,
        word_count_goal: goal,
        completion_percentage: completion_percentage(words, goal),
        estimated_reading_time: estimate_reading_time(words),
        by_status,
    }
}
