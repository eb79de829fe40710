use super::*;
use crate::models::{NoteId, TagId};
use tempfile::tempdir;

fn table_names(db: &Database) -> Vec<String> {
    db.connection()
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .filter_map(|r| r.ok())
        .collect()
}

#[test]
fn in_memory_opens_successfully() {
    let result = Database::in_memory();
    assert!(result.is_ok());
}

#[test]
fn schema_tables_exist() {
    let db = Database::in_memory().unwrap();

    let tables = table_names(&db);

    assert!(tables.contains(&"note".to_string()));
    assert!(tables.contains(&"tag".to_string()));
    assert!(tables.contains(&"note_tag_mapping".to_string()));
    assert!(tables.contains(&"schema_migrations".to_string()));
}

#[test]
fn schema_indexes_exist() {
    let db = Database::in_memory().unwrap();

    let indexes: Vec<String> = db
        .connection()
        .prepare(
            "SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name",
        )
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .filter_map(|r| r.ok())
        .collect();

    assert!(indexes.contains(&"idx_tag_key".to_string()));
    assert!(indexes.contains(&"idx_note_changed".to_string()));
    assert!(indexes.contains(&"idx_note_tag_mapping_note".to_string()));
    assert!(indexes.contains(&"idx_note_tag_mapping_tag".to_string()));
}

#[test]
fn all_migrations_recorded() {
    let db = Database::in_memory().unwrap();

    let version = current_version(db.connection()).unwrap();

    assert_eq!(version, MIGRATIONS.last().unwrap().version);
}

#[test]
fn open_creates_database_file() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let result = Database::open(&db_path);
    assert!(result.is_ok());
    assert!(db_path.exists());
}

#[test]
fn reopen_is_idempotent() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    // Open and close first time
    {
        let db = Database::open(&db_path).unwrap();
        db.create_note(1, 1, "persisted", "").unwrap();
    }

    // Reopen - migrations should not run twice
    let db = Database::open(&db_path).unwrap();

    let applied: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(applied as usize, MIGRATIONS.len());
    assert_eq!(db.count_notes().unwrap(), 1);
}

#[test]
fn link_table_has_no_uniqueness_constraint() {
    let db = Database::in_memory().unwrap();

    // Raw inserts bypass the procedural check and must succeed
    for _ in 0..2 {
        db.connection()
            .execute(
                "INSERT INTO note_tag_mapping (note_reference, tag_reference) VALUES (1, 1)",
                [],
            )
            .unwrap();
    }

    assert_eq!(db.count_links(NoteId::new(1)).unwrap(), 2);
}

// --- notes ---

#[test]
fn create_note_assigns_increasing_ids() {
    let db = Database::in_memory().unwrap();

    let first = db.create_note(1, 1, "first", "").unwrap();
    let second = db.create_note(2, 2, "second", "").unwrap();

    assert!(first.get() > 0);
    assert!(second > first);
}

#[test]
fn ids_are_not_reused_after_delete() {
    let db = Database::in_memory().unwrap();

    let first = db.create_note(1, 1, "first", "").unwrap();
    db.delete_note(first).unwrap();
    let second = db.create_note(2, 2, "second", "").unwrap();

    assert!(second > first);
}

#[test]
fn get_note_returns_none_for_missing_id() {
    let db = Database::in_memory().unwrap();

    assert_eq!(db.get_note(NoteId::new(42)).unwrap(), None);
}

#[test]
fn get_note_reads_back_all_fields() {
    let db = Database::in_memory().unwrap();
    let id = db.create_note(10, 20, "Title", "Body").unwrap();

    let note = db.get_note(id).unwrap().expect("note should exist");

    assert_eq!(note.id, id);
    assert_eq!(note.title, "Title");
    assert_eq!(note.content, "Body");
    assert_eq!(note.created, 10);
    assert_eq!(note.changed, 20);
    assert!(note.tags.is_empty());
}

#[test]
fn update_note_keeps_created() {
    let db = Database::in_memory().unwrap();
    let id = db.create_note(10, 10, "old", "old").unwrap();

    let touched = db.update_note(id, 99, "new", "").unwrap();

    assert_eq!(touched, 1);
    let note = db.get_note(id).unwrap().unwrap();
    assert_eq!(note.created, 10);
    assert_eq!(note.changed, 99);
    assert_eq!(note.title, "new");
    assert_eq!(note.content, "");
}

#[test]
fn update_missing_note_is_a_no_op() {
    let db = Database::in_memory().unwrap();

    let touched = db.update_note(NoteId::new(9999), 1, "ghost", "").unwrap();

    assert_eq!(touched, 0);
    assert_eq!(db.count_notes().unwrap(), 0);
}

#[test]
fn list_notes_recent_orders_by_changed_then_id() {
    let db = Database::in_memory().unwrap();
    db.create_note(0, 100, "A", "").unwrap();
    db.create_note(0, 300, "B", "").unwrap();
    db.create_note(0, 200, "C", "").unwrap();
    db.create_note(0, 200, "D", "").unwrap();

    let titles: Vec<String> = db
        .list_notes_recent(10)
        .unwrap()
        .into_iter()
        .map(|n| n.title)
        .collect();

    assert_eq!(titles, vec!["B", "D", "C", "A"]);
}

#[test]
fn list_notes_recent_respects_limit() {
    let db = Database::in_memory().unwrap();
    for i in 0..5 {
        db.create_note(i, i, "n", "").unwrap();
    }

    assert_eq!(db.list_notes_recent(3).unwrap().len(), 3);
    assert!(db.list_notes_recent(0).unwrap().is_empty());
}

#[test]
fn listed_tags_are_sorted_case_insensitively() {
    let db = Database::in_memory().unwrap();
    let id = db.create_note(1, 1, "t", "").unwrap();
    for name in ["beta", "Alpha", "gamma"] {
        let tag = db.find_or_create_tag(name).unwrap();
        db.add_link(id, tag).unwrap();
    }

    let notes = db.list_notes_recent(10).unwrap();

    assert_eq!(notes[0].tags, vec!["Alpha", "beta", "gamma"]);
}

#[test]
fn duplicate_link_rows_do_not_duplicate_tags() {
    let db = Database::in_memory().unwrap();
    let id = db.create_note(1, 1, "t", "").unwrap();
    let tag = db.find_or_create_tag("x").unwrap();
    for _ in 0..2 {
        db.connection()
            .execute(
                "INSERT INTO note_tag_mapping (note_reference, tag_reference) VALUES (?1, ?2)",
                [id.get(), tag.get()],
            )
            .unwrap();
    }

    assert_eq!(db.get_note(id).unwrap().unwrap().tags, vec!["x"]);
}

#[test]
fn search_matches_title_and_content_ignoring_case() {
    let db = Database::in_memory().unwrap();
    db.create_note(0, 1, "Alpha", "").unwrap();
    db.create_note(0, 2, "Beta", "alphabet soup").unwrap();
    db.create_note(0, 3, "Gamma", "delta").unwrap();

    let titles: Vec<String> = db
        .search_notes("ALPHA", 10)
        .unwrap()
        .into_iter()
        .map(|n| n.title)
        .collect();

    assert_eq!(titles, vec!["Beta", "Alpha"]);
}

#[test]
fn search_ignores_case_of_non_ascii_letters() {
    let db = Database::in_memory().unwrap();
    db.create_note(0, 1, "Ärger im Büro", "").unwrap();
    db.create_note(0, 2, "Other", "ÉTÉ à Paris").unwrap();

    let found = db.search_notes("ärger", 10).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Ärger im Büro");

    assert_eq!(db.search_notes("BÜRO", 10).unwrap().len(), 1);
    assert_eq!(db.search_notes("été", 10).unwrap()[0].title, "Other");
}

#[test]
fn search_treats_like_metacharacters_as_wildcards() {
    let db = Database::in_memory().unwrap();
    db.create_note(0, 1, "cat", "").unwrap();
    db.create_note(0, 2, "cut", "").unwrap();
    db.create_note(0, 3, "dog", "").unwrap();

    assert_eq!(db.search_notes("c_t", 10).unwrap().len(), 2);
    assert_eq!(db.search_notes("%", 10).unwrap().len(), 3);
}

#[test]
fn search_binds_text_containing_quotes() {
    let db = Database::in_memory().unwrap();
    db.create_note(0, 1, "it's here", "").unwrap();
    db.create_note(0, 2, "other", "").unwrap();

    let found = db.search_notes("it's", 10).unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "it's here");
}

#[test]
fn delete_note_removes_its_links_but_not_tags() {
    let db = Database::in_memory().unwrap();
    let id = db.create_note(1, 1, "doomed", "").unwrap();
    let tag = db.find_or_create_tag("t").unwrap();
    db.add_link(id, tag).unwrap();

    db.delete_note(id).unwrap();

    assert!(db.get_note(id).unwrap().is_none());
    assert_eq!(db.count_links(id).unwrap(), 0);
    assert!(db.get_tag(tag).unwrap().is_some());
}

#[test]
fn orphan_links_never_surface_on_other_notes() {
    let db = Database::in_memory().unwrap();
    let kept = db.create_note(1, 1, "kept", "").unwrap();
    let tag = db.find_or_create_tag("stray").unwrap();

    // Link for a note id that has no row
    db.connection()
        .execute(
            "INSERT INTO note_tag_mapping (note_reference, tag_reference) VALUES (?1, ?2)",
            [kept.get() + 100, tag.get()],
        )
        .unwrap();

    let notes = db.list_notes_recent(10).unwrap();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].tags.is_empty());
    assert!(db.search_notes("", 10).unwrap()[0].tags.is_empty());
}

#[test]
fn reopen_purges_orphan_links_left_by_old_deletes() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("orphans.db");

    // Simulate a database written before deletes cascaded
    {
        let db = Database::open(&db_path).unwrap();
        db.connection()
            .execute_batch(
                "INSERT INTO note_tag_mapping (note_reference, tag_reference) VALUES (77, 1);
                 DELETE FROM schema_migrations WHERE version = 3;",
            )
            .unwrap();
    }

    let db = Database::open(&db_path).unwrap();

    assert_eq!(db.count_links(NoteId::new(77)).unwrap(), 0);
}

// --- tags ---

#[test]
fn find_or_create_tag_is_stable_across_case_and_whitespace() {
    let db = Database::in_memory().unwrap();

    let first = db.find_or_create_tag("Work").unwrap();
    let second = db.find_or_create_tag("  work ").unwrap();
    let third = db.find_or_create_tag("WORK").unwrap();

    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(db.list_tags().unwrap().len(), 1);
    assert_eq!(db.get_tag(first).unwrap().unwrap().name(), "Work");
}

#[test]
fn find_or_create_tag_stores_trimmed_name() {
    let db = Database::in_memory().unwrap();

    let id = db.find_or_create_tag("  Spaced Out  ").unwrap();

    assert_eq!(db.get_tag(id).unwrap().unwrap().name(), "Spaced Out");
}

#[test]
fn find_or_create_tag_rejects_blank_names() {
    let db = Database::in_memory().unwrap();

    assert!(db.find_or_create_tag("   ").is_err());
    assert!(db.list_tags().unwrap().is_empty());
}

#[test]
fn tag_names_with_quotes_are_bound_safely() {
    let db = Database::in_memory().unwrap();

    let id = db.find_or_create_tag("it's \"quoted\"; DROP TABLE tag; --").unwrap();

    assert_eq!(
        db.get_tag(id).unwrap().unwrap().name(),
        "it's \"quoted\"; DROP TABLE tag; --"
    );
    assert!(table_names(&db).contains(&"tag".to_string()));
}

#[test]
fn find_tag_does_not_create() {
    let db = Database::in_memory().unwrap();

    assert_eq!(db.find_tag("absent").unwrap(), None);
    assert!(db.list_tags().unwrap().is_empty());
}

#[test]
fn add_link_is_idempotent() {
    let db = Database::in_memory().unwrap();
    let note = db.create_note(1, 1, "n", "").unwrap();
    let tag = db.find_or_create_tag("t").unwrap();

    assert!(db.add_link(note, tag).unwrap());
    assert!(!db.add_link(note, tag).unwrap());

    assert!(db.link_exists(note, tag).unwrap());
    assert_eq!(db.count_links(note).unwrap(), 1);
}

#[test]
fn remove_link_only_affects_the_pair() {
    let db = Database::in_memory().unwrap();
    let first = db.create_note(1, 1, "first", "").unwrap();
    let second = db.create_note(2, 2, "second", "").unwrap();
    let tag = db.find_or_create_tag("shared").unwrap();
    db.add_link(first, tag).unwrap();
    db.add_link(second, tag).unwrap();

    assert!(db.remove_link(first, tag).unwrap());
    assert!(!db.remove_link(first, tag).unwrap());

    assert!(!db.link_exists(first, tag).unwrap());
    assert!(db.link_exists(second, tag).unwrap());
}

#[test]
fn link_exists_is_false_for_unknown_ids() {
    let db = Database::in_memory().unwrap();

    assert!(!db.link_exists(NoteId::new(1), TagId::new(1)).unwrap());
}

#[test]
fn get_tag_names_for_note_returns_display_names() {
    let db = Database::in_memory().unwrap();
    let note = db.create_note(1, 1, "n", "").unwrap();
    for name in ["Zed", "apple"] {
        let tag = db.find_or_create_tag(name).unwrap();
        db.add_link(note, tag).unwrap();
    }

    assert_eq!(db.get_tag_names_for_note(note).unwrap(), vec!["apple", "Zed"]);
}

// --- transactions ---

#[test]
fn failed_transaction_rolls_back() {
    let db = Database::in_memory().unwrap();

    let result: anyhow::Result<()> = db.in_transaction(|db| {
        db.create_note(1, 1, "rolled back", "")?;
        anyhow::bail!("boom");
    });

    assert!(result.is_err());
    assert_eq!(db.count_notes().unwrap(), 0);
}

#[test]
fn nested_transactions_join_the_outer_one() {
    let db = Database::in_memory().unwrap();

    db.in_transaction(|outer| {
        let id = outer.create_note(1, 1, "n", "")?;
        outer.delete_note(id)?;
        outer.create_note(2, 2, "kept", "")?;
        Ok(())
    })
    .unwrap();

    assert_eq!(db.count_notes().unwrap(), 1);
}
