use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use super::Database;
use super::notes::sorted_unique;
use crate::models::{NoteId, Tag, TagId};
use crate::reconciler::tag_key;

impl Database {
    /// Returns the id of the tag matching `name`, creating the tag if needed.
    ///
    /// Lookup compares trimmed, lowercased names. A new tag is stored with the
    /// trimmed name in the casing given here. Blank names are rejected.
    pub fn find_or_create_tag(&self, name: &str) -> Result<TagId> {
        let display = name.trim();
        if display.is_empty() {
            anyhow::bail!("Tag name cannot be empty");
        }

        if let Some(id) = self.find_tag(display)? {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO tag (tag_name, tag_key) VALUES (?1, ?2)",
            params![display, tag_key(display)],
        )?;

        Ok(TagId::new(self.conn.last_insert_rowid()))
    }

    /// Looks up a tag by name without creating it.
    pub fn find_tag(&self, name: &str) -> Result<Option<TagId>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT tag_id FROM tag WHERE tag_key = ?1",
                [tag_key(name)],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id.map(TagId::new))
    }

    /// Retrieves a tag by id.
    pub fn get_tag(&self, id: TagId) -> Result<Option<Tag>> {
        let name: Option<String> = self
            .conn
            .query_row(
                "SELECT tag_name FROM tag WHERE tag_id = ?1",
                [id.get()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(name.map(|name| Tag::new(id, name)))
    }

    /// Lists every stored tag, including ones no note links to.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag_id, tag_name FROM tag ORDER BY tag_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Tag::new(TagId::new(row.get(0)?), row.get::<_, String>(1)?))
        })?;

        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }

        Ok(tags)
    }

    /// Checks whether a link row exists for the pair.
    pub fn link_exists(&self, note_id: NoteId, tag_id: TagId) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM note_tag_mapping
                 WHERE note_reference = ?1 AND tag_reference = ?2
             )",
            params![note_id.get(), tag_id.get()],
            |row| row.get(0),
        )?;

        Ok(exists)
    }

    /// Links a note to a tag unless the link already exists.
    ///
    /// Returns `true` if a row was inserted.
    pub fn add_link(&self, note_id: NoteId, tag_id: TagId) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO note_tag_mapping (note_reference, tag_reference)
             SELECT ?1, ?2
             WHERE NOT EXISTS (
                 SELECT 1 FROM note_tag_mapping
                 WHERE note_reference = ?1 AND tag_reference = ?2
             )",
            params![note_id.get(), tag_id.get()],
        )?;

        Ok(inserted > 0)
    }

    /// Removes the link between a note and a tag.
    ///
    /// Returns `true` if any row was removed.
    pub fn remove_link(&self, note_id: NoteId, tag_id: TagId) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM note_tag_mapping WHERE note_reference = ?1 AND tag_reference = ?2",
            params![note_id.get(), tag_id.get()],
        )?;

        Ok(removed > 0)
    }

    /// Returns the display names of the tags linked to a note.
    pub fn get_tag_names_for_note(&self, note_id: NoteId) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.tag_name
             FROM note_tag_mapping m
             JOIN tag t ON t.tag_id = m.tag_reference
             WHERE m.note_reference = ?1",
        )?;
        let rows = stmt.query_map([note_id.get()], |row| row.get::<_, String>(0))?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }

        Ok(sorted_unique(names))
    }

    /// Counts link rows for a note, duplicates included.
    pub fn count_links(&self, note_id: NoteId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM note_tag_mapping WHERE note_reference = ?1",
            [note_id.get()],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }
}
