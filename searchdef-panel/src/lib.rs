//! Search definition panel library exports.

pub mod api_client;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod notifications;
pub mod panel;
pub mod scheduler;
pub mod sync;

pub use panel::{
    CommitOutcome, PanelFields, PanelPhase, SearchDefinitionPanel, SubtreeSelection, PANEL_TITLE,
};
