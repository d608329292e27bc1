//! Search definition panel controller.
//!
//! The panel owns the three editable fields of a search note and keeps them
//! in step with the note's labels:
//!
//! ```text
//! Unbound --bind--> Bound --edit--> Dirty --timer/flush--> Committing
//!                     ^                                      |   |
//!                     +-------------- success ---------------+   |
//!                                     Dirty <--- failure --------+
//! ```
//!
//! Every bind starts a new generation. A commit captures the generation,
//! note id and field values when it starts and only writes its outcome
//! back if the generation is still current, so a commit for a previous
//! note can finish in the background without touching the new note's
//! fields.

use crate::error::PanelError;
use crate::notifications::{Notification, NotificationAction, NotificationLevel};
use crate::scheduler::SpacedUpdate;
use crate::sync::AttributeSynchronizer;
use searchdef_core::{
    Note, NoteCache, NoteId, NoteStore, NoteSuggestion, SearchContent, SearchDefinition,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::Notify;

/// Heading shown for the panel.
pub const PANEL_TITLE: &str = "Search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelPhase {
    Unbound,
    Bound,
    Dirty,
    Committing,
}

/// Scope note picked through autocomplete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreeSelection {
    pub note_id: NoteId,
    pub title: String,
}

impl From<NoteSuggestion> for SubtreeSelection {
    fn from(suggestion: NoteSuggestion) -> Self {
        Self {
            note_id: suggestion.note_id,
            title: suggestion.title,
        }
    }
}

/// Current values of the panel's input controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelFields {
    pub search_string: String,
    pub subtree: Option<SubtreeSelection>,
    pub include_note_content: bool,
}

impl Default for PanelFields {
    fn default() -> Self {
        Self {
            search_string: String::new(),
            subtree: None,
            include_note_content: true,
        }
    }
}

impl PanelFields {
    pub fn definition(&self) -> SearchDefinition {
        SearchDefinition {
            search_string: self.search_string.clone(),
            include_note_content: self.include_note_content,
            sub_tree_note_id: self.subtree.as_ref().map(|s| s.note_id.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Written and refreshed.
    Committed,
    /// No unsaved edits.
    NothingToCommit,
    /// Another commit is running; it will pick these edits up.
    Coalesced,
    /// Written, but the panel was rebound meanwhile.
    Stale,
}

#[derive(Debug, Clone)]
struct BoundNote {
    note_id: NoteId,
    title: String,
}

#[derive(Debug)]
struct PanelState {
    phase: PanelPhase,
    generation: u64,
    /// Bumped on every edit; compared against the committed revision.
    revision: u64,
    follow_up: bool,
    /// Commit cycles currently running, stale ones included.
    active_commits: usize,
    bound: Option<BoundNote>,
    fields: PanelFields,
    notifications: Vec<Notification>,
}

impl PanelState {
    fn new() -> Self {
        Self {
            phase: PanelPhase::Unbound,
            generation: 0,
            revision: 0,
            follow_up: false,
            active_commits: 0,
            bound: None,
            fields: PanelFields::default(),
            notifications: Vec::new(),
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn ticket(&self) -> Option<CommitTicket> {
        let bound = self.bound.as_ref()?;
        Some(CommitTicket {
            generation: self.generation,
            revision: self.revision,
            note_id: bound.note_id.clone(),
            title: bound.title.clone(),
            definition: self.fields.definition(),
        })
    }
}

/// Snapshot a commit works from.
struct CommitTicket {
    generation: u64,
    revision: u64,
    note_id: NoteId,
    title: String,
    definition: SearchDefinition,
}

struct PanelShared {
    sync: AttributeSynchronizer,
    cache: Arc<dyn NoteCache>,
    state: Mutex<PanelState>,
    /// Held for the duration of a commit's writes.
    commit_gate: tokio::sync::Mutex<()>,
    /// Woken whenever a commit cycle ends.
    commit_done: Notify,
    scheduler: SpacedUpdate,
}

/// Counts a running commit cycle for as long as it is alive.
struct ActiveCommit<'a> {
    shared: &'a PanelShared,
}

impl Drop for ActiveCommit<'_> {
    fn drop(&mut self) {
        self.shared.lock_state().active_commits -= 1;
        self.shared.commit_done.notify_waiters();
    }
}

/// Handle to a search definition panel. Clones share the same panel.
#[derive(Clone)]
pub struct SearchDefinitionPanel {
    shared: Arc<PanelShared>,
}

impl SearchDefinitionPanel {
    pub fn new(store: Arc<dyn NoteStore>, cache: Arc<dyn NoteCache>, debounce: Duration) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<PanelShared>| {
            let weak = weak.clone();
            PanelShared {
                sync: AttributeSynchronizer::new(store),
                cache,
                state: Mutex::new(PanelState::new()),
                commit_gate: tokio::sync::Mutex::new(()),
                commit_done: Notify::new(),
                scheduler: SpacedUpdate::new(debounce, move || {
                    let weak = weak.clone();
                    async move {
                        if let Some(shared) = weak.upgrade() {
                            // Failures are already logged and notified.
                            let _ = shared.commit_cycle().await;
                        }
                    }
                }),
            }
        });
        Self { shared }
    }

    /// Whether this panel is shown for `note`.
    pub fn applies_to(note: &Note) -> bool {
        note.is_search()
    }

    /// Load `note` into the panel, discarding any unsaved edits for the
    /// previously bound note, then refresh its results.
    pub async fn bind(&self, note: &Note) {
        let shared = &self.shared;
        let generation = {
            let mut state = shared.lock_state();
            shared.scheduler.cancel();
            state.generation += 1;
            state.phase = PanelPhase::Unbound;
            state.bound = None;
            state.follow_up = false;
            state.generation
        };

        let definition = SearchDefinition::from_attributes(&note.attributes);
        let (subtree, warning) = shared.resolve_subtree(definition.sub_tree_note_id.as_ref()).await;

        {
            let mut state = shared.lock_state();
            if state.generation != generation {
                tracing::debug!(note_id = %note.note_id, generation, "bind superseded");
                return;
            }
            state.fields = PanelFields {
                search_string: definition.search_string,
                subtree,
                include_note_content: definition.include_note_content,
            };
            state.bound = Some(BoundNote {
                note_id: note.note_id.clone(),
                title: note.title.clone(),
            });
            state.revision = 0;
            state.phase = PanelPhase::Bound;
            if let Some(warning) = warning {
                state.notify(warning);
            }
        }
        tracing::info!(note_id = %note.note_id, generation, "search definition bound");

        // Results may be stale relative to the labels even without edits.
        shared.refresh(&note.note_id).await;
    }

    /// Unbind and drop any pending edits.
    pub fn dispose(&self) {
        let mut state = self.shared.lock_state();
        self.shared.scheduler.cancel();
        state.generation += 1;
        state.phase = PanelPhase::Unbound;
        state.bound = None;
        state.follow_up = false;
        state.fields = PanelFields::default();
    }

    pub fn set_search_string(&self, value: impl Into<String>) -> bool {
        let value = value.into();
        self.shared.edit(move |fields| fields.search_string = value)
    }

    /// Autocomplete closed with `selection` (or with nothing chosen).
    pub fn select_subtree(&self, selection: Option<SubtreeSelection>) -> bool {
        self.shared.edit(move |fields| fields.subtree = selection)
    }

    pub fn set_include_note_content(&self, include: bool) -> bool {
        self.shared
            .edit(move |fields| fields.include_note_content = include)
    }

    /// Commit unsaved edits now instead of waiting for the timer.
    pub async fn flush(&self) -> Result<CommitOutcome, PanelError> {
        {
            let state = self.shared.lock_state();
            match state.phase {
                PanelPhase::Unbound => return Err(PanelError::NotBound),
                PanelPhase::Bound => return Ok(CommitOutcome::NothingToCommit),
                PanelPhase::Dirty | PanelPhase::Committing => {}
            }
            self.shared.scheduler.cancel();
        }
        self.shared.commit_cycle().await
    }

    /// Wait until no commit cycle is running, including commits still
    /// finishing for a previously bound note. A timer that is armed but has
    /// not fired is not waited for.
    pub async fn settle(&self) {
        loop {
            let done = self.shared.commit_done.notified();
            tokio::pin!(done);
            done.as_mut().enable();
            if self.shared.lock_state().active_commits == 0 {
                return;
            }
            done.await;
        }
    }

    /// Invalidate cached results for the bound note.
    pub async fn refresh_results(&self) -> Result<(), PanelError> {
        let note_id = self.bound_note_id().ok_or(PanelError::NotBound)?;
        self.shared.refresh(&note_id).await;
        Ok(())
    }

    /// `{"searchString": ...}` export of the current text.
    pub fn get_content(&self) -> Result<String, PanelError> {
        let content = SearchContent {
            search_string: self.shared.lock_state().fields.search_string.clone(),
        };
        Ok(content.to_json()?)
    }

    pub fn phase(&self) -> PanelPhase {
        self.shared.lock_state().phase
    }

    pub fn fields(&self) -> PanelFields {
        self.shared.lock_state().fields.clone()
    }

    pub fn bound_note_id(&self) -> Option<NoteId> {
        self.shared
            .lock_state()
            .bound
            .as_ref()
            .map(|b| b.note_id.clone())
    }

    pub fn bound_title(&self) -> Option<String> {
        self.shared
            .lock_state()
            .bound
            .as_ref()
            .map(|b| b.title.clone())
    }

    pub fn has_pending_update(&self) -> bool {
        self.shared.scheduler.is_pending()
    }

    pub fn drain_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut self.shared.lock_state().notifications)
    }
}

impl PanelShared {
    fn lock_state(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn edit(&self, apply: impl FnOnce(&mut PanelFields)) -> bool {
        let mut state = self.lock_state();
        match state.phase {
            PanelPhase::Unbound => {
                tracing::debug!("edit ignored, panel is not bound");
                return false;
            }
            PanelPhase::Bound | PanelPhase::Dirty => state.phase = PanelPhase::Dirty,
            PanelPhase::Committing => {}
        }
        apply(&mut state.fields);
        state.revision += 1;
        self.scheduler.schedule_update();
        true
    }

    /// Take the committer role, or hand the work to the running commit.
    fn claim(&self) -> Result<CommitTicket, CommitOutcome> {
        let mut state = self.lock_state();
        match state.phase {
            PanelPhase::Unbound | PanelPhase::Bound => Err(CommitOutcome::NothingToCommit),
            PanelPhase::Committing => {
                state.follow_up = true;
                Err(CommitOutcome::Coalesced)
            }
            PanelPhase::Dirty => {
                let ticket = state.ticket().ok_or(CommitOutcome::NothingToCommit)?;
                state.phase = PanelPhase::Committing;
                state.follow_up = false;
                state.active_commits += 1;
                Ok(ticket)
            }
        }
    }

    async fn commit_cycle(&self) -> Result<CommitOutcome, PanelError> {
        let ticket = match self.claim() {
            Ok(ticket) => ticket,
            Err(outcome) => return Ok(outcome),
        };
        let _active = ActiveCommit { shared: self };
        self.run_commits(ticket).await
    }

    /// Commit `ticket`, then any follow-up queued while it was running.
    async fn run_commits(&self, mut ticket: CommitTicket) -> Result<CommitOutcome, PanelError> {
        loop {
            let result = {
                let _writing = self.commit_gate.lock().await;
                self.sync
                    .commit(&ticket.note_id, &ticket.title, &ticket.definition)
                    .await
            };

            let receipt = match result {
                Ok(receipt) => receipt,
                Err(err) => {
                    tracing::warn!(
                        note_id = %ticket.note_id,
                        generation = ticket.generation,
                        error = %err,
                        "search definition commit failed"
                    );
                    let mut state = self.lock_state();
                    let message = format!("Saving search failed: {}", err);
                    if state.generation == ticket.generation {
                        state.phase = PanelPhase::Dirty;
                        let follow_up = std::mem::take(&mut state.follow_up);
                        // Edits that arrived mid-commit have no timer left to carry them.
                        if follow_up || state.revision != ticket.revision {
                            self.scheduler.schedule_update();
                        }
                        state.notify(
                            Notification::new(NotificationLevel::Error, message)
                                .with_action(NotificationAction::Retry),
                        );
                    } else {
                        // The failed write belonged to a note that is no longer bound.
                        state.notify(Notification::new(
                            NotificationLevel::Warning,
                            format!("{} (note {})", message, ticket.note_id),
                        ));
                    }
                    return Err(err.into());
                }
            };

            let (stale, next) = {
                let mut state = self.lock_state();
                if state.generation != ticket.generation {
                    tracing::debug!(
                        note_id = %ticket.note_id,
                        generation = ticket.generation,
                        "discarding writeback of stale commit"
                    );
                    state.notify(Notification::new(
                        NotificationLevel::Info,
                        format!("Search for note {} saved", ticket.note_id),
                    ));
                    (true, None)
                } else {
                    if let (Some(bound), Some(title)) = (state.bound.as_mut(), receipt.new_title) {
                        bound.title = title;
                    }
                    let edited = state.revision != ticket.revision;
                    let follow_up = std::mem::take(&mut state.follow_up);
                    if edited && follow_up {
                        (false, state.ticket())
                    } else {
                        state.phase = if edited {
                            PanelPhase::Dirty
                        } else {
                            PanelPhase::Bound
                        };
                        (false, None)
                    }
                }
            };

            self.refresh(&ticket.note_id).await;

            match next {
                Some(follow_up) => ticket = follow_up,
                None if stale => return Ok(CommitOutcome::Stale),
                None => return Ok(CommitOutcome::Committed),
            }
        }
    }

    async fn refresh(&self, note_id: &NoteId) {
        if let Err(err) = self.cache.reload_notes(std::slice::from_ref(note_id)).await {
            tracing::warn!(note_id = %note_id, error = %err, "result refresh failed");
            self.lock_state().notify(Notification::new(
                NotificationLevel::Warning,
                format!("Refreshing search results failed: {}", err),
            ));
        }
    }

    /// Look up the display title of the scope note. A scope note that no
    /// longer resolves is treated as "no restriction".
    async fn resolve_subtree(
        &self,
        note_id: Option<&NoteId>,
    ) -> (Option<SubtreeSelection>, Option<Notification>) {
        let Some(note_id) = note_id else {
            return (None, None);
        };
        let reason = match self.cache.get_note(note_id).await {
            Ok(Some(note)) => {
                return (
                    Some(SubtreeSelection {
                        note_id: note_id.clone(),
                        title: note.title,
                    }),
                    None,
                )
            }
            Ok(None) => "note no longer exists".to_string(),
            Err(err) => err.to_string(),
        };
        tracing::warn!(note_id = %note_id, reason = %reason, "subtree note did not resolve");
        let warning = Notification::new(
            NotificationLevel::Warning,
            format!("Subtree note {} could not be loaded ({}); search is not restricted", note_id, reason),
        );
        (None, Some(warning))
    }
}
