//! Error types for note persistence collaborators.

use crate::identity::NoteId;
use thiserror::Error;

/// Failures reported by the persistence and cache collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Attribute write failed for note {note_id}: {reason}")]
    AttributeWriteFailed { note_id: NoteId, reason: String },

    #[error("Title write failed for note {note_id}: {reason}")]
    TitleWriteFailed { note_id: NoteId, reason: String },

    #[error("Fetch failed for note {note_id}: {reason}")]
    FetchFailed { note_id: NoteId, reason: String },

    #[error("Note service unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Result type for collaborator calls.
pub type StorageResult<T> = Result<T, StorageError>;
