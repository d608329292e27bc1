//! Client-side note cache.
//!
//! `TreeCache` keeps the notes the panel has looked at. Reloading a note
//! refetches it and announces the reloaded ids on a broadcast channel so
//! result views can recompute.

use async_trait::async_trait;
use searchdef_core::{Note, NoteCache, NoteId, StorageResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Source of truth behind the cache.
#[async_trait]
pub trait NoteFetcher: Send + Sync {
    /// `Ok(None)` when the note does not exist.
    async fn fetch_note(&self, note_id: &NoteId) -> StorageResult<Option<Note>>;
}

pub struct TreeCache {
    fetcher: Arc<dyn NoteFetcher>,
    notes: RwLock<HashMap<NoteId, Note>>,
    changes: broadcast::Sender<Vec<NoteId>>,
}

impl TreeCache {
    pub fn new(fetcher: Arc<dyn NoteFetcher>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            fetcher,
            notes: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Receive the ids of every reload from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<NoteId>> {
        self.changes.subscribe()
    }

    /// Cached copy only; never fetches.
    pub async fn cached(&self, note_id: &NoteId) -> Option<Note> {
        self.notes.read().await.get(note_id).cloned()
    }
}

#[async_trait]
impl NoteCache for TreeCache {
    async fn reload_notes(&self, note_ids: &[NoteId]) -> StorageResult<()> {
        let mut fetched = Vec::with_capacity(note_ids.len());
        for note_id in note_ids {
            fetched.push((note_id.clone(), self.fetcher.fetch_note(note_id).await?));
        }

        {
            let mut notes = self.notes.write().await;
            for (note_id, note) in fetched {
                match note {
                    Some(note) => {
                        notes.insert(note_id, note);
                    }
                    None => {
                        notes.remove(&note_id);
                    }
                }
            }
        }

        tracing::debug!(count = note_ids.len(), "notes reloaded");
        // No subscribers is fine.
        let _ = self.changes.send(note_ids.to_vec());
        Ok(())
    }

    async fn get_note(&self, note_id: &NoteId) -> StorageResult<Option<Note>> {
        if let Some(note) = self.cached(note_id).await {
            return Ok(Some(note));
        }
        let fetched = self.fetcher.fetch_note(note_id).await?;
        if let Some(note) = &fetched {
            self.notes
                .write()
                .await
                .insert(note_id.clone(), note.clone());
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchdef_core::{NoteType, StorageError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingFetcher {
        notes: Mutex<HashMap<NoteId, Note>>,
        fetches: AtomicUsize,
        failing: AtomicUsize,
    }

    impl CountingFetcher {
        fn put(&self, note: Note) {
            self.notes
                .lock()
                .unwrap()
                .insert(note.note_id.clone(), note);
        }

        fn delete(&self, note_id: &NoteId) {
            self.notes.lock().unwrap().remove(note_id);
        }
    }

    #[async_trait]
    impl NoteFetcher for CountingFetcher {
        async fn fetch_note(&self, note_id: &NoteId) -> StorageResult<Option<Note>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) > 0 {
                return Err(StorageError::FetchFailed {
                    note_id: note_id.clone(),
                    reason: "offline".to_string(),
                });
            }
            Ok(self.notes.lock().unwrap().get(note_id).cloned())
        }
    }

    fn setup() -> (Arc<CountingFetcher>, TreeCache) {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = TreeCache::new(fetcher.clone());
        (fetcher, cache)
    }

    #[tokio::test]
    async fn get_note_fetches_once_then_serves_cache() {
        let (fetcher, cache) = setup();
        fetcher.put(Note::new("n1", "Music", NoteType::Text));

        let first = cache.get_note(&NoteId::new("n1")).await.unwrap();
        let second = cache.get_note(&NoteId::new("n1")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_note_is_not_cached() {
        let (fetcher, cache) = setup();
        assert_eq!(cache.get_note(&NoteId::new("ghost")).await.unwrap(), None);
        assert_eq!(cache.get_note(&NoteId::new("ghost")).await.unwrap(), None);
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reload_refetches_and_announces() {
        let (fetcher, cache) = setup();
        let id = NoteId::new("s1");
        fetcher.put(Note::new("s1", "Search: old", NoteType::Search));
        cache.get_note(&id).await.unwrap();

        fetcher.put(Note::new("s1", "Search: new", NoteType::Search));
        let mut changes = cache.subscribe();
        cache.reload_notes(std::slice::from_ref(&id)).await.unwrap();

        assert_eq!(cache.cached(&id).await.unwrap().title, "Search: new");
        assert_eq!(changes.recv().await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn reload_evicts_deleted_notes() {
        let (fetcher, cache) = setup();
        let id = NoteId::new("s2");
        fetcher.put(Note::new("s2", "Search: x", NoteType::Search));
        cache.get_note(&id).await.unwrap();

        fetcher.delete(&id);
        cache.reload_notes(std::slice::from_ref(&id)).await.unwrap();
        assert!(cache.cached(&id).await.is_none());
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_copy() {
        let (fetcher, cache) = setup();
        let id = NoteId::new("s3");
        fetcher.put(Note::new("s3", "Search: kept", NoteType::Search));
        cache.get_note(&id).await.unwrap();

        fetcher.failing.store(1, Ordering::SeqCst);
        assert!(cache.reload_notes(std::slice::from_ref(&id)).await.is_err());
        assert_eq!(cache.cached(&id).await.unwrap().title, "Search: kept");
    }
}
