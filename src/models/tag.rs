use serde::{Deserialize, Serialize};

use super::TagId;

/// A stored tag.
///
/// `name` keeps the casing it was first inserted with. Equality between tags is
/// decided by their normalized key, see [`crate::reconciler::tag_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    id: TagId,
    name: String,
}

impl Tag {
    /// Creates a tag value from a stored row.
    ///
    /// # Examples
    ///
    /// ```
    /// use notesock::{Tag, TagId};
    ///
    /// let tag = Tag::new(TagId::new(1), "Work");
    /// assert_eq!(tag.id(), TagId::new(1));
    /// assert_eq!(tag.name(), "Work");
    /// ```
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the tag's identifier.
    pub fn id(&self) -> TagId {
        self.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}
