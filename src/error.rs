//! Error types for request handling.

use thiserror::Error;

/// Failure of a single note operation.
///
/// None of these end a session: the handler logs them and sends no reply.
/// A missing id is not an error; edits and deletes of it succeed silently.
#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl NoteError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        NoteError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a validation error for a field the request must carry
    pub fn missing(field: impl Into<String>) -> Self {
        Self::validation(field, "field is required")
    }
}

/// Result type alias for note operations
pub type NoteResult<T> = Result<T, NoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_names_the_field() {
        let err = NoteError::missing("title");
        assert_eq!(err.to_string(), "Validation error in title: field is required");
    }

    #[test]
    fn storage_error_wraps_anyhow() {
        let err: NoteError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, NoteError::Storage(_)));
        assert_eq!(err.to_string(), "Storage error: disk full");
    }
}
