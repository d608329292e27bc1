//! Searchdef Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Mock note store with call recording, failure injection and a write gate
//! - Mock note cache and autocomplete
//! - Proptest generators and note fixtures

pub use searchdef_core::{
    Attribute, AttributeType, Note, NoteAutocomplete, NoteCache, NoteId, NoteStore,
    NoteSuggestion, NoteType, SearchDefinition, StorageError, StorageResult,
};

use async_trait::async_trait;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

const OPEN_GATE_PERMITS: usize = 1024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// MOCK NOTE STORE
// ============================================================================

/// A persistence call as seen by the mock store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    PutAttributes {
        note_id: NoteId,
        attributes: Vec<Attribute>,
    },
    PutTitle {
        note_id: NoteId,
        title: String,
    },
}

#[derive(Debug, Default)]
struct StoreState {
    calls: Vec<StoreCall>,
    titles: HashMap<NoteId, String>,
    attributes: HashMap<NoteId, Vec<Attribute>>,
    failing_attribute_writes: usize,
    failing_title_writes: usize,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory `NoteStore` that records every call.
///
/// Attribute writes can be held at a gate so tests can observe a commit
/// while it is in flight.
#[derive(Clone)]
pub struct MockNoteStore {
    state: Arc<Mutex<StoreState>>,
    held: Arc<AtomicBool>,
    gate: Arc<Semaphore>,
}

impl Default for MockNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNoteStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            held: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.state).calls.clone()
    }

    /// Attribute lists written so far, oldest first.
    pub fn attribute_writes(&self) -> Vec<(NoteId, Vec<Attribute>)> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::PutAttributes {
                    note_id,
                    attributes,
                } => Some((note_id.clone(), attributes.clone())),
                StoreCall::PutTitle { .. } => None,
            })
            .collect()
    }

    /// Titles written so far, oldest first.
    pub fn title_writes(&self) -> Vec<(NoteId, String)> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::PutTitle { note_id, title } => Some((note_id.clone(), title.clone())),
                StoreCall::PutAttributes { .. } => None,
            })
            .collect()
    }

    /// Last attribute list successfully stored for a note.
    pub fn stored_attributes(&self, note_id: &NoteId) -> Option<Vec<Attribute>> {
        lock(&self.state).attributes.get(note_id).cloned()
    }

    pub fn stored_title(&self, note_id: &NoteId) -> Option<String> {
        lock(&self.state).titles.get(note_id).cloned()
    }

    /// Make the next `count` attribute writes fail.
    pub fn fail_attribute_writes(&self, count: usize) {
        lock(&self.state).failing_attribute_writes = count;
    }

    /// Make the next `count` title writes fail.
    pub fn fail_title_writes(&self, count: usize) {
        lock(&self.state).failing_title_writes = count;
    }

    /// Block attribute writes until released.
    pub fn hold_writes(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Let one held attribute write through.
    pub fn release_write(&self) {
        self.gate.add_permits(1);
    }

    /// Stop holding writes and release everything waiting.
    pub fn open_writes(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.add_permits(OPEN_GATE_PERMITS);
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.state).in_flight
    }

    /// Highest number of attribute writes observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        lock(&self.state).max_in_flight
    }

    /// Yield until at least `count` attribute writes are in flight.
    ///
    /// Panics if that never happens.
    pub async fn wait_for_in_flight(&self, count: usize) {
        for _ in 0..10_000 {
            if self.in_flight() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {count} attribute writes in flight");
    }
}

#[async_trait]
impl NoteStore for MockNoteStore {
    async fn put_attributes(&self, note_id: &NoteId, attributes: &[Attribute]) -> StorageResult<()> {
        {
            let mut state = lock(&self.state);
            state.calls.push(StoreCall::PutAttributes {
                note_id: note_id.clone(),
                attributes: attributes.to_vec(),
            });
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }

        if self.held.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }

        let mut state = lock(&self.state);
        state.in_flight -= 1;
        if state.failing_attribute_writes > 0 {
            state.failing_attribute_writes -= 1;
            return Err(StorageError::AttributeWriteFailed {
                note_id: note_id.clone(),
                reason: "injected failure".to_string(),
            });
        }
        state.attributes.insert(note_id.clone(), attributes.to_vec());
        Ok(())
    }

    async fn put_title(&self, note_id: &NoteId, title: &str) -> StorageResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(StoreCall::PutTitle {
            note_id: note_id.clone(),
            title: title.to_string(),
        });
        if state.failing_title_writes > 0 {
            state.failing_title_writes -= 1;
            return Err(StorageError::TitleWriteFailed {
                note_id: note_id.clone(),
                reason: "injected failure".to_string(),
            });
        }
        state.titles.insert(note_id.clone(), title.to_string());
        Ok(())
    }
}

// ============================================================================
// MOCK NOTE CACHE
// ============================================================================

#[derive(Debug, Default)]
struct CacheState {
    notes: HashMap<NoteId, Note>,
    reloads: Vec<Vec<NoteId>>,
    failing_lookups: bool,
    failing_reloads: bool,
}

/// In-memory `NoteCache` that records reloads.
#[derive(Debug, Clone, Default)]
pub struct MockNoteCache {
    state: Arc<Mutex<CacheState>>,
}

impl MockNoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let cache = Self::new();
        for note in notes {
            cache.insert(note);
        }
        cache
    }

    pub fn insert(&self, note: Note) {
        lock(&self.state).notes.insert(note.note_id.clone(), note);
    }

    pub fn reload_calls(&self) -> Vec<Vec<NoteId>> {
        lock(&self.state).reloads.clone()
    }

    /// Number of reloads that included `note_id`.
    pub fn reload_count(&self, note_id: &NoteId) -> usize {
        lock(&self.state)
            .reloads
            .iter()
            .filter(|ids| ids.contains(note_id))
            .count()
    }

    pub fn fail_lookups(&self, failing: bool) {
        lock(&self.state).failing_lookups = failing;
    }

    pub fn fail_reloads(&self, failing: bool) {
        lock(&self.state).failing_reloads = failing;
    }
}

#[async_trait]
impl NoteCache for MockNoteCache {
    async fn reload_notes(&self, note_ids: &[NoteId]) -> StorageResult<()> {
        let mut state = lock(&self.state);
        state.reloads.push(note_ids.to_vec());
        if state.failing_reloads {
            return Err(StorageError::Unavailable {
                reason: "injected reload failure".to_string(),
            });
        }
        Ok(())
    }

    async fn get_note(&self, note_id: &NoteId) -> StorageResult<Option<Note>> {
        let state = lock(&self.state);
        if state.failing_lookups {
            return Err(StorageError::FetchFailed {
                note_id: note_id.clone(),
                reason: "injected lookup failure".to_string(),
            });
        }
        Ok(state.notes.get(note_id).cloned())
    }
}

// ============================================================================
// MOCK AUTOCOMPLETE
// ============================================================================

/// Case-insensitive title match over a fixed note list.
#[derive(Debug, Clone, Default)]
pub struct MockAutocomplete {
    notes: Vec<NoteSuggestion>,
}

impl MockAutocomplete {
    pub fn new(notes: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        Self {
            notes: notes
                .into_iter()
                .map(|(id, title)| NoteSuggestion {
                    note_id: NoteId::new(id),
                    title: title.to_string(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl NoteAutocomplete for MockAutocomplete {
    async fn autocomplete(&self, query: &str) -> StorageResult<Vec<NoteSuggestion>> {
        let needle = query.to_lowercase();
        Ok(self
            .notes
            .iter()
            .filter(|s| s.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// A search note carrying `definition` as its labels.
pub fn search_note(id: &str, title: &str, definition: &SearchDefinition) -> Note {
    Note::new(id, title, NoteType::Search).with_attributes(definition.to_attributes())
}

/// A plain text note, usable as a subtree target.
pub fn text_note(id: &str, title: &str) -> Note {
    Note::new(id, title, NoteType::Text)
}

// ============================================================================
// GENERATORS
// ============================================================================

pub fn arb_note_id() -> impl Strategy<Value = NoteId> {
    "[a-zA-Z0-9]{4,12}".prop_map(NoteId::new)
}

pub fn arb_search_definition() -> impl Strategy<Value = SearchDefinition> {
    (".{0,48}", any::<bool>(), proptest::option::of(arb_note_id())).prop_map(
        |(search_string, include_note_content, sub_tree_note_id)| SearchDefinition {
            search_string,
            include_note_content,
            sub_tree_note_id,
        },
    )
}
