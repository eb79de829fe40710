pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod protocol;
pub mod reconciler;
pub mod server;
pub mod service;
pub mod session;

pub use db::Database;
pub use error::{NoteError, NoteResult};
pub use models::{Note, NoteId, Tag, TagId};
pub use reconciler::{ReconcileOutcome, TagReconciler};
pub use service::{NoteService, RESULT_LIMIT};
pub use session::{Session, SessionOptions, SessionState, SharedService, Transport};
