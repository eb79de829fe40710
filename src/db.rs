mod migration;
mod notes;
mod tags;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;

pub use migration::{MIGRATIONS, current_version};

/// Storage engine for notes, tags and note-tag links.
///
/// Owns the single SQLite connection for the lifetime of the service. The
/// connection is opened at startup and closed when the value is dropped.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically applies all migrations on open.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically applies pending migrations on open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        register_functions(&conn)?;
        migration::apply_pending_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Runs `f` inside a transaction, committing only if it succeeds.
    ///
    /// Nested calls join the outer transaction.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        // Dropping the transaction on error rolls it back
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    /// Returns a reference to the underlying connection.
    ///
    /// Useful for executing custom queries in tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Registers `fold(text)`, the Unicode lowercase used for case-insensitive search.
///
/// `LIKE` alone only folds ASCII letters.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests;
