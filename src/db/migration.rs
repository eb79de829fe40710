use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use time::OffsetDateTime;

/// One step of the note store's schema history.
///
/// Steps are append-only: a released step is never edited, a later step
/// changes what it left behind. `version` is the row key in
/// `schema_migrations`.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

impl Migration {
    pub const fn new(version: u32, description: &'static str, up: &'static str) -> Self {
        Self {
            version,
            description,
            up,
        }
    }

    /// Whether `schema_migrations` already records this step.
    pub fn is_applied(&self, conn: &Connection) -> Result<bool> {
        let recorded = conn
            .query_row(
                "SELECT 1 FROM schema_migrations WHERE version = ?1",
                [self.version],
                |_| Ok(()),
            )
            .optional()?;
        Ok(recorded.is_some())
    }

    /// Runs the step's SQL and its bookkeeping row in one transaction, so a
    /// store is never left half way between two schema versions.
    pub fn apply(&self, conn: &mut Connection) -> Result<()> {
        let tx = conn.transaction()?;
        tx.execute_batch(self.up)
            .with_context(|| format!("Migration {} failed", self.version))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?1, ?2, ?3)",
            params![
                self.version,
                OffsetDateTime::now_utc().unix_timestamp(),
                self.description
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

/// Schema history of the note store, oldest first.
///
/// 1 creates the note, tag and link tables with the unique tag key. 2 adds
/// the indexes behind recent-first listing and per-note link lookups. 3
/// clears link rows left by deletes that predate cascading link removal.
pub const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        "Initial schema: note, tag, note_tag_mapping",
        include_str!("migrations/001_initial_schema.sql"),
    ),
    Migration::new(
        2,
        "Indexes for recent-first listing and link lookups",
        include_str!("migrations/002_lookup_indexes.sql"),
    ),
    Migration::new(
        3,
        "Remove link rows whose note no longer exists",
        include_str!("migrations/003_purge_orphan_links.sql"),
    ),
];

/// Brings the store up to the latest schema version.
///
/// Called on every open, so an up to date store applies nothing. Returns
/// how many steps ran.
pub fn apply_pending_migrations(conn: &mut Connection) -> Result<usize> {
    ensure_migration_table_exists(conn)?;

    let mut applied = 0;
    for migration in MIGRATIONS {
        if !migration.is_applied(conn)? {
            migration.apply(conn)?;
            tracing::info!(
                version = migration.version,
                "Applied migration: {}",
                migration.description
            );
            applied += 1;
        }
    }

    Ok(applied)
}

fn ensure_migration_table_exists(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT
         )",
    )?;
    Ok(())
}

/// Returns the highest applied migration version, or 0 on a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}
