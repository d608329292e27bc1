//! Headless search definition panel driven from stdin.

use searchdef_core::{NoteAutocomplete, NoteCache, NoteId};
use searchdef_panel::api_client::RestClient;
use searchdef_panel::cache::TreeCache;
use searchdef_panel::commands::PanelCommand;
use searchdef_panel::config::PanelConfig;
use searchdef_panel::error::PanelError;
use searchdef_panel::notifications::NotificationLevel;
use searchdef_panel::{PanelPhase, SearchDefinitionPanel, SubtreeSelection, PANEL_TITLE};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const NOTIFICATION_POLL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<(), PanelError> {
    let config = PanelConfig::load()?;
    init_tracing(&config.log_filter);

    let client = Arc::new(RestClient::new(&config)?);
    let cache = Arc::new(TreeCache::new(client.clone()));
    let panel = SearchDefinitionPanel::new(client.clone(), cache.clone(), config.debounce());

    if let Some(note_id) = &config.note_id {
        bind_note(&panel, cache.as_ref(), note_id).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(NOTIFICATION_POLL);
    let mut reloads = cache.subscribe();

    loop {
        tokio::select! {
            _ = ticker.tick() => print_notifications(&panel),
            Ok(note_ids) = reloads.recv() => {
                tracing::debug!(?note_ids, "search results invalidated");
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match PanelCommand::parse(&line) {
                    Ok(command) => {
                        if handle_command(&panel, cache.as_ref(), client.as_ref(), command).await? {
                            break;
                        }
                    }
                    Err(err) => eprintln!("{err}"),
                }
            }
        }
    }

    // Let a running commit finish, then write edits still waiting for the timer.
    panel.settle().await;
    if panel.phase() == PanelPhase::Dirty {
        if let Err(err) = panel.flush().await {
            tracing::error!(error = %err, "final flush failed");
        }
    }
    print_notifications(&panel);
    panel.dispose();
    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn bind_note(panel: &SearchDefinitionPanel, cache: &TreeCache, note_id: &NoteId) {
    match cache.get_note(note_id).await {
        Ok(Some(note)) if SearchDefinitionPanel::applies_to(&note) => panel.bind(&note).await,
        Ok(Some(note)) => eprintln!(
            "Note {} is a {:?} note; the {} panel only applies to search notes",
            note.note_id, note.note_type, PANEL_TITLE
        ),
        Ok(None) => eprintln!("Note {note_id} not found"),
        Err(err) => eprintln!("Loading note {note_id} failed: {err}"),
    }
}

/// Returns `true` when the driver should stop.
async fn handle_command(
    panel: &SearchDefinitionPanel,
    cache: &TreeCache,
    autocomplete: &dyn NoteAutocomplete,
    command: PanelCommand,
) -> Result<bool, PanelError> {
    match command {
        PanelCommand::Quit => return Ok(true),
        PanelCommand::Search(text) => {
            panel.set_search_string(text);
        }
        PanelCommand::Subtree(query) => match autocomplete.autocomplete(&query).await {
            Ok(suggestions) => match suggestions.into_iter().next() {
                Some(hit) => {
                    println!("Limiting search to '{}' ({})", hit.title, hit.note_id);
                    panel.select_subtree(Some(SubtreeSelection::from(hit)));
                }
                None => eprintln!("No note matches '{query}'"),
            },
            Err(err) => eprintln!("Autocomplete failed: {err}"),
        },
        PanelCommand::SubtreeClear => {
            panel.select_subtree(None);
        }
        PanelCommand::IncludeContent(include) => {
            panel.set_include_note_content(include);
        }
        PanelCommand::Flush => match panel.flush().await {
            Ok(outcome) => println!("{outcome:?}"),
            Err(err) => eprintln!("Flush failed: {err}"),
        },
        PanelCommand::Bind(note_id) => bind_note(panel, cache, &note_id).await,
        PanelCommand::Show => {
            let fields = panel.fields();
            println!("phase:   {:?}", panel.phase());
            println!(
                "note:    {} ({})",
                panel.bound_note_id().map(|id| id.to_string()).unwrap_or_default(),
                panel.bound_title().unwrap_or_default()
            );
            println!("search:  {}", fields.search_string);
            println!(
                "subtree: {}",
                fields.subtree.map(|s| s.title).unwrap_or_default()
            );
            println!("content: {}", fields.include_note_content);
        }
        PanelCommand::ContentJson => println!("{}", panel.get_content()?),
    }
    Ok(false)
}

fn print_notifications(panel: &SearchDefinitionPanel) {
    for notification in panel.drain_notifications() {
        let tag = match notification.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warn",
            NotificationLevel::Error => "error",
        };
        match notification.action {
            Some(action) => eprintln!("[{tag}] {} ({action:?})", notification.message),
            None => eprintln!("[{tag}] {}", notification.message),
        }
    }
}
