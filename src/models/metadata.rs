use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Writing status of a node.
///
/// - `NotStarted`: Nothing written yet
/// - `InProgress`: Drafting or revising
/// - `Completed`: Done, as far as the author is concerned
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// Progress information attached to every node.
///
/// `actual_word_count`, `completion_percentage` and `estimated_reading_time`
/// are derived from the node's content by [`crate::progress::derive_on_save`]
/// and always change together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub status: Status,
    #[serde(default, deserialize_with = "lenient_goal")]
    pub word_count_goal: u32,
    #[serde(default)]
    pub actual_word_count: u32,
    /// Percentage in `[0, 100]`, rounded to two decimals.
    #[serde(default)]
    pub completion_percentage: f64,
    /// Minutes.
    #[serde(default)]
    pub estimated_reading_time: u32,
    pub last_modified: DateTime<Utc>,
    pub creation_date: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default = "default_version")]
    pub version: String,
}

impl Metadata {
    /// Fresh metadata for a node created at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            status: Status::NotStarted,
            word_count_goal: 0,
            actual_word_count: 0,
            completion_percentage: 0.0,
            estimated_reading_time: 0,
            last_modified: now,
            creation_date: now,
            tags: BTreeSet::new(),
            author: String::new(),
            version: default_version(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Partial update for the user-editable metadata fields.
///
/// Fields left as `None` keep their current value. Derived fields are
/// deliberately absent: they can only change through a content save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    pub status: Option<Status>,
    #[serde(default, deserialize_with = "lenient_goal_opt")]
    pub word_count_goal: Option<u32>,
    pub tags: Option<BTreeSet<String>>,
    pub author: Option<String>,
    pub version: Option<String>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.word_count_goal.is_none()
            && self.tags.is_none()
            && self.author.is_none()
            && self.version.is_none()
    }
}

/// Coerce an arbitrary numeric goal into a word count.
///
/// NaN, infinities and negative values become `0`; fractions are truncated.
pub fn coerce_goal(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        0
    } else if value >= u32::MAX as f64 {
        u32::MAX
    } else {
        value.trunc() as u32
    }
}

/// Goal values arrive from form fields, so strings, floats and garbage are
/// all accepted and anything non-numeric collapses to `0`.
fn goal_from_value(value: serde_json::Value) -> u32 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(coerce_goal).unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().map(coerce_goal).unwrap_or(0),
        _ => 0,
    }
}

fn lenient_goal<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(goal_from_value)
}

fn lenient_goal_opt<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.map(goal_from_value))
}
