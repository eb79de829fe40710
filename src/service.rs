use anyhow::Result;
use time::OffsetDateTime;

use crate::error::{NoteError, NoteResult};
use crate::models::Note;
use crate::protocol::{CreateNote, DeleteNote, EditNote, Request, Response, SearchNotes};
use crate::reconciler::TagReconciler;
use crate::{Database, NoteId};

/// Maximum number of notes returned by a list or search.
pub const RESULT_LIMIT: usize = 10;

/// Service layer implementing the note operations of the channel protocol.
///
/// NoteService owns the Database instance and turns decoded requests into
/// storage mutations and reply payloads. It has no knowledge of the transport,
/// so it can be driven directly in tests.
///
/// # Examples
///
/// ```
/// use notesock::{Database, NoteService};
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Database::in_memory()?;
/// let service = NoteService::new(db);
/// # Ok(())
/// # }
/// ```
pub struct NoteService {
    db: Database,
}

impl NoteService {
    /// Creates a new NoteService with the given database.
    ///
    /// Takes ownership of the database instance; it is released when the
    /// service is dropped.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns a reference to the underlying database.
    ///
    /// Useful for testing or diagnostics that need direct storage access.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Routes a decoded request to the matching operation.
    pub fn handle(&self, request: Request) -> NoteResult<Response> {
        match request {
            Request::Create(create) => self.create(create),
            Request::List => self.list(),
            Request::Edit(edit) => self.edit(edit),
            Request::Delete(delete) => self.delete(delete),
            Request::Search(search) => self.search(search),
        }
    }

    /// Creates a note and links its tags.
    ///
    /// `title` and `content` are required and `title` must not be blank.
    /// Missing timestamps default to the server clock in milliseconds. The
    /// insert and the tag links are written in one transaction.
    ///
    /// Returns `POST_BACK` carrying the stored note, including its assigned id
    /// and the display names of its tags.
    ///
    /// # Examples
    ///
    /// ```
    /// use notesock::{Database, NoteService};
    /// use notesock::protocol::{CreateNote, Response};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let service = NoteService::new(Database::in_memory()?);
    ///
    /// let response = service.create(CreateNote {
    ///     title: Some("Groceries".to_string()),
    ///     content: Some("milk, eggs".to_string()),
    ///     tags: vec!["Home".to_string()],
    ///     created: Some(100),
    ///     changed: Some(100),
    /// })?;
    ///
    /// let Response::PostBack(note) = response else { unreachable!() };
    /// assert!(note.id.get() > 0);
    /// assert_eq!(note.tags, vec!["Home"]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn create(&self, request: CreateNote) -> NoteResult<Response> {
        let title = required_title(request.title)?;
        let content = request.content.ok_or_else(|| NoteError::missing("content"))?;
        let now = now_millis();
        let created = request.created.unwrap_or(now);
        let changed = request.changed.unwrap_or(created);

        let note = self.db.in_transaction(|db| {
            let id = db.create_note(created, changed, &title, &content)?;
            TagReconciler::new(db).reconcile(id, &request.tags)?;

            Ok(Note {
                id,
                tags: db.get_tag_names_for_note(id)?,
                title,
                content,
                created,
                changed,
            })
        })?;

        tracing::debug!(note_id = note.id.get(), tags = note.tags.len(), "Created note");
        Ok(Response::PostBack(note))
    }

    /// Lists the most recently changed notes, newest first.
    ///
    /// Returns `GET_BACK` with at most [`RESULT_LIMIT`] notes.
    pub fn list(&self) -> NoteResult<Response> {
        let note_list = self.db.list_notes_recent(RESULT_LIMIT)?;
        Ok(Response::GetBack { note_list })
    }

    /// Edits a note in place.
    ///
    /// `id`, `title` and `content` are required. `created` never changes. When
    /// `tags` is present the note's links are reconciled against it. An id
    /// with no matching note is acknowledged like any other edit and leaves
    /// the store untouched.
    ///
    /// Returns a bare `EDIT_BACK`.
    pub fn edit(&self, request: EditNote) -> NoteResult<Response> {
        let id = request.id.ok_or_else(|| NoteError::missing("id"))?;
        let title = required_title(request.title)?;
        let content = request.content.ok_or_else(|| NoteError::missing("content"))?;
        let changed = request.changed.unwrap_or_else(now_millis);

        self.db.in_transaction(|db| {
            if db.update_note(id, changed, &title, &content)? == 0 {
                tracing::debug!(note_id = id.get(), "Edit of missing note ignored");
                return Ok(());
            }
            if let Some(tags) = &request.tags {
                TagReconciler::new(db).reconcile(id, tags)?;
            }
            Ok(())
        })?;

        Ok(Response::EditBack)
    }

    /// Deletes a note and its tag links.
    ///
    /// This operation is idempotent: deleting a non-existent note is still
    /// acknowledged. Returns a bare `DELETE_BACK`.
    pub fn delete(&self, request: DeleteNote) -> NoteResult<Response> {
        let id = request.id.ok_or_else(|| NoteError::missing("id"))?;
        self.db.delete_note(id)?;

        Ok(Response::DeleteBack)
    }

    /// Finds notes whose title or content contains `text`.
    ///
    /// Matching ignores case, including non-ASCII letters. An empty `text`
    /// matches every note.
    /// Returns `SEARCH_BACK` with at most [`RESULT_LIMIT`] notes, most
    /// recently changed first.
    ///
    /// # Examples
    ///
    /// ```
    /// use notesock::{Database, NoteService};
    /// use notesock::protocol::{Response, SearchNotes};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let service = NoteService::new(Database::in_memory()?);
    ///
    /// let response = service.search(SearchNotes { text: Some(String::new()) })?;
    /// assert_eq!(response, Response::SearchBack { note_list: vec![] });
    /// # Ok(())
    /// # }
    /// ```
    pub fn search(&self, request: SearchNotes) -> NoteResult<Response> {
        let text = request.text.ok_or_else(|| NoteError::missing("text"))?;
        let note_list = self.db.search_notes(&text, RESULT_LIMIT)?;

        Ok(Response::SearchBack { note_list })
    }

    /// Retrieves a single note by id.
    pub fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        self.db.get_note(id)
    }
}

fn required_title(title: Option<String>) -> NoteResult<String> {
    let title = title.ok_or_else(|| NoteError::missing("title"))?;
    if title.trim().is_empty() {
        return Err(NoteError::validation("title", "cannot be empty"));
    }
    Ok(title)
}

/// Current time in milliseconds since the Unix epoch, matching browser clocks.
fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
