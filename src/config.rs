//! Server configuration.
//!
//! Every option can come from a command-line flag or an environment variable.
//! A `.env` file in the working directory is loaded before parsing.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use crate::session::SessionOptions;

/// notesock - real-time note store served over a WebSocket
#[derive(Debug, Clone, Parser)]
#[command(name = "notesock")]
#[command(about = "Serves a tagged note store to a browser client over a WebSocket")]
#[command(version)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "NOTESOCK_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// SQLite database file (defaults to the platform data directory)
    #[arg(long, env = "NOTESOCK_DATABASE", value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Push the recent note list to every client as soon as it connects
    #[arg(long, env = "NOTESOCK_SNAPSHOT_ON_CONNECT")]
    pub snapshot_on_connect: bool,
}

impl ServerConfig {
    /// Loads `.env` if present, then parses flags and environment.
    pub fn load() -> Self {
        // A missing .env file is not an error
        dotenvy::dotenv().ok();
        Self::parse()
    }

    /// Resolves the database path, falling back to the default location.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => default_database_path(),
        }
    }

    /// Options applied to every session.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            snapshot_on_connect: self.snapshot_on_connect,
        }
    }
}

/// Gets the cross-platform database path.
///
/// Returns the path as `{data_dir}/notesock/notes.db` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn default_database_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("notesock").join("notes.db"))
}

/// Ensures the parent directory of the database file exists.
///
/// Creates the directory structure if it doesn't exist using `create_dir_all`.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}
