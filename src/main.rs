use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use notesock::config::{ServerConfig, ensure_database_directory};
use notesock::{Database, NoteService, server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = ServerConfig::load();
    init_tracing();

    if let Err(e) = run(config).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

/// Installs the log subscriber, honouring `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notesock=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Opens the store, serves until shutdown, then releases the store.
async fn run(config: ServerConfig) -> Result<()> {
    let db_path = config.database_path()?;
    ensure_database_directory(&db_path)?;

    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "Opened note store");

    let service = Arc::new(Mutex::new(NoteService::new(db)));
    server::serve(config.bind, service, config.session_options()).await
}
