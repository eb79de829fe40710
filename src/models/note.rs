use serde::{Deserialize, Serialize};

use super::NoteId;

/// A note together with the display names of its linked tags.
///
/// Serializes to the shape the browser client renders:
/// `{id, title, content, tags, created, changed}`. Timestamps are opaque
/// integers supplied by the client clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Identity assigned by the store.
    pub id: NoteId,
    /// Never empty.
    pub title: String,
    /// May be empty.
    pub content: String,
    /// Tag display names, sorted case-insensitively.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Set once at creation.
    pub created: i64,
    /// Bumped by every edit.
    pub changed: i64,
}
