//! Tag reconciliation: bring a note's links in line with a desired tag set.

use std::collections::{HashMap, HashSet};

use anyhow::Result;

use crate::Database;
use crate::models::NoteId;

/// Normalizes a tag name into its identity key.
///
/// Two names denote the same tag exactly when their keys are equal.
///
/// # Examples
///
/// ```
/// use notesock::reconciler::tag_key;
///
/// assert_eq!(tag_key("  Work "), "work");
/// assert_eq!(tag_key("HOME"), tag_key("home"));
/// ```
#[must_use]
pub fn tag_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// What a reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Display names of the tags newly linked.
    pub added: Vec<String>,
    /// Display names of the tags unlinked.
    pub removed: Vec<String>,
}

impl ReconcileOutcome {
    /// Returns true when the note's links were already in the desired state.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Diffs a note's stored tags against a desired set and applies the difference.
pub struct TagReconciler<'a> {
    db: &'a Database,
}

impl<'a> TagReconciler<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Links exactly the tags named in `desired` to the note.
    ///
    /// Names are compared by [`tag_key`]. Blank names are skipped, and the
    /// first spelling of a repeated name is the one used for a new tag.
    /// Tags that lose their last link are kept.
    pub fn reconcile<S: AsRef<str>>(&self, note_id: NoteId, desired: &[S]) -> Result<ReconcileOutcome> {
        let current: HashMap<String, String> = self
            .db
            .get_tag_names_for_note(note_id)?
            .into_iter()
            .map(|name| (tag_key(&name), name))
            .collect();

        let mut wanted = HashSet::new();
        let mut to_add = Vec::new();
        for name in desired {
            let name = name.as_ref().trim();
            let key = tag_key(name);
            if key.is_empty() || !wanted.insert(key.clone()) {
                continue;
            }
            if !current.contains_key(&key) {
                to_add.push(name.to_string());
            }
        }

        let to_remove: Vec<String> = current
            .iter()
            .filter(|(key, _)| !wanted.contains(*key))
            .map(|(_, name)| name.clone())
            .collect();

        let mut outcome = ReconcileOutcome::default();

        for name in to_add {
            let tag_id = self.db.find_or_create_tag(&name)?;
            if self.db.add_link(note_id, tag_id)? {
                outcome.added.push(name);
            }
        }

        for name in to_remove {
            let Some(tag_id) = self.db.find_tag(&name)? else {
                continue;
            };
            if self.db.remove_link(note_id, tag_id)? {
                outcome.removed.push(name);
            }
        }

        tracing::debug!(
            note_id = note_id.get(),
            added = outcome.added.len(),
            removed = outcome.removed.len(),
            "Reconciled tags"
        );

        Ok(outcome)
    }
}
