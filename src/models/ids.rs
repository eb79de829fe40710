use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a stored note.
///
/// Assigned by the storage engine on insert and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    /// Creates a new note ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying row id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a tag row, stable from its first use onwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(i64);

impl TagId {
    /// Creates a new tag ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying row id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_id_is_a_bare_integer_on_the_wire() {
        let json = serde_json::to_string(&NoteId::new(42)).unwrap();
        assert_eq!(json, "42");

        let parsed: NoteId = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, NoteId::new(7));
    }

    #[test]
    fn display_prints_raw_value() {
        assert_eq!(NoteId::new(3).to_string(), "3");
        assert_eq!(TagId::new(11).to_string(), "11");
    }
}
