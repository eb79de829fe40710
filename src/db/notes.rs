use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, Row, params};

use super::Database;
use crate::models::{Note, NoteId};
use crate::reconciler::tag_key;

/// Selects one row per note with its tag names aggregated as a JSON array.
///
/// Links are joined through existing note rows only, so links whose note is
/// gone never show up.
const NOTE_WITH_TAGS: &str = "
    SELECT n.id, n.title, n.content, n.created, n.changed,
           json_group_array(t.tag_name) FILTER (WHERE t.tag_name IS NOT NULL)
    FROM note n
    LEFT JOIN note_tag_mapping m ON m.note_reference = n.id
    LEFT JOIN tag t ON t.tag_id = m.tag_reference";

/// Raw row before the aggregated tag list is decoded.
struct NoteRow {
    id: i64,
    title: String,
    content: String,
    created: i64,
    changed: i64,
    tags_json: String,
}

impl NoteRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            created: row.get(3)?,
            changed: row.get(4)?,
            tags_json: row.get(5)?,
        })
    }

    fn into_note(self) -> Result<Note> {
        let names: Vec<String> = serde_json::from_str(&self.tags_json)
            .with_context(|| format!("Malformed tag list for note {}", self.id))?;

        Ok(Note {
            id: NoteId::new(self.id),
            title: self.title,
            content: self.content,
            tags: sorted_unique(names),
            created: self.created,
            changed: self.changed,
        })
    }
}

/// Sorts tag names case-insensitively and drops duplicates by tag key.
pub(super) fn sorted_unique(mut names: Vec<String>) -> Vec<String> {
    names.sort_by_cached_key(|name| (tag_key(name), name.clone()));
    names.dedup_by(|a, b| tag_key(a) == tag_key(b));
    names
}

impl Database {
    /// Inserts a note and returns its newly assigned id.
    pub fn create_note(
        &self,
        created: i64,
        changed: i64,
        title: &str,
        content: &str,
    ) -> Result<NoteId> {
        self.conn.execute(
            "INSERT INTO note (created, changed, title, content) VALUES (?1, ?2, ?3, ?4)",
            params![created, changed, title, content],
        )?;

        Ok(NoteId::new(self.conn.last_insert_rowid()))
    }

    /// Retrieves a note with its tags.
    ///
    /// Returns `None` if no note exists with the given id.
    pub fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        let query = format!("{NOTE_WITH_TAGS} WHERE n.id = ?1 GROUP BY n.id");

        let row = self
            .conn
            .query_row(&query, [id.get()], NoteRow::from_row)
            .optional()?;

        row.map(NoteRow::into_note).transpose()
    }

    /// Lists up to `limit` notes, most recently changed first.
    ///
    /// Ties on `changed` are broken by id, newest first.
    pub fn list_notes_recent(&self, limit: usize) -> Result<Vec<Note>> {
        let query = format!(
            "{NOTE_WITH_TAGS}
             GROUP BY n.id
             ORDER BY n.changed DESC, n.id DESC
             LIMIT ?1"
        );

        self.collect_notes(&query, params![limit as i64])
    }

    /// Lists up to `limit` notes whose title or content contains `text`.
    ///
    /// Both sides are lowercased with `fold`, so matching ignores case for
    /// any script. `%` or `_` inside `text` act as `LIKE` wildcards. An empty
    /// `text` matches every note.
    pub fn search_notes(&self, text: &str, limit: usize) -> Result<Vec<Note>> {
        let query = format!(
            "{NOTE_WITH_TAGS}
             WHERE fold(n.title) LIKE '%' || fold(?1) || '%'
                OR fold(n.content) LIKE '%' || fold(?1) || '%'
             GROUP BY n.id
             ORDER BY n.changed DESC, n.id DESC
             LIMIT ?2"
        );

        self.collect_notes(&query, params![text, limit as i64])
    }

    /// Overwrites a note's title, content and `changed` timestamp.
    ///
    /// Updating a missing id is a silent no-op. Returns the number of rows
    /// touched, which callers are free to ignore.
    pub fn update_note(
        &self,
        id: NoteId,
        changed: i64,
        title: &str,
        content: &str,
    ) -> Result<usize> {
        let updated = self.conn.execute(
            "UPDATE note SET changed = ?2, title = ?3, content = ?4 WHERE id = ?1",
            params![id.get(), changed, title, content],
        )?;

        Ok(updated)
    }

    /// Deletes a note together with its link rows.
    ///
    /// Tag rows are left in place. Deleting a missing id is a no-op.
    pub fn delete_note(&self, id: NoteId) -> Result<()> {
        self.in_transaction(|db| {
            db.conn.execute(
                "DELETE FROM note_tag_mapping WHERE note_reference = ?1",
                [id.get()],
            )?;
            db.conn.execute("DELETE FROM note WHERE id = ?1", [id.get()])?;
            Ok(())
        })
    }

    /// Counts stored notes.
    pub fn count_notes(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM note", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn collect_notes(&self, query: &str, params: impl rusqlite::Params) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(query)?;
        let rows = stmt.query_map(params, NoteRow::from_row)?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?.into_note()?);
        }

        Ok(notes)
    }
}
