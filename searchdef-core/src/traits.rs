//! Collaborator traits the panel depends on.
//!
//! Implementations live elsewhere: the REST client and note cache in
//! `searchdef-panel`, mocks in `searchdef-test-utils`.

use crate::attribute::Attribute;
use crate::error::StorageResult;
use crate::identity::NoteId;
use crate::note::Note;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Write side of note persistence.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Replace the named attributes on a note. Callers observe the write
    /// as all-or-nothing.
    async fn put_attributes(&self, note_id: &NoteId, attributes: &[Attribute]) -> StorageResult<()>;

    /// Set a note's title.
    async fn put_title(&self, note_id: &NoteId, title: &str) -> StorageResult<()>;
}

/// Client-side note cache.
#[async_trait]
pub trait NoteCache: Send + Sync {
    /// Invalidate and refetch the given notes so dependent views recompute.
    async fn reload_notes(&self, note_ids: &[NoteId]) -> StorageResult<()>;

    /// Look up a note, fetching it if it is not cached. `Ok(None)` means
    /// the note does not exist.
    async fn get_note(&self, note_id: &NoteId) -> StorageResult<Option<Note>>;
}

/// One autocomplete hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSuggestion {
    pub note_id: NoteId,
    pub title: String,
}

/// Note lookup by partial title.
#[async_trait]
pub trait NoteAutocomplete: Send + Sync {
    async fn autocomplete(&self, query: &str) -> StorageResult<Vec<NoteSuggestion>>;
}
