//! Pushes a search definition onto its note.

use searchdef_core::{Attribute, NoteId, NoteStore, SearchDefinition, StorageResult};
use std::sync::Arc;

/// What a successful commit wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub note_id: NoteId,
    pub attributes: Vec<Attribute>,
    /// Set when the generated title was rewritten.
    pub new_title: Option<String>,
}

#[derive(Clone)]
pub struct AttributeSynchronizer {
    store: Arc<dyn NoteStore>,
}

impl AttributeSynchronizer {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// Write the full label set, then rename the note if its current title
    /// is a generated one.
    ///
    /// The first failing call aborts the commit; nothing already written is
    /// rolled back.
    pub async fn commit(
        &self,
        note_id: &NoteId,
        current_title: &str,
        definition: &SearchDefinition,
    ) -> StorageResult<CommitReceipt> {
        let attributes = definition.to_attributes();
        self.store.put_attributes(note_id, &attributes).await?;

        let new_title = definition.rewritten_title(current_title);
        if let Some(title) = &new_title {
            self.store.put_title(note_id, title).await?;
        }

        tracing::debug!(
            note_id = %note_id,
            attributes = attributes.len(),
            renamed = new_title.is_some(),
            "search definition committed"
        );
        Ok(CommitReceipt {
            note_id: note_id.clone(),
            attributes,
            new_title,
        })
    }
}
