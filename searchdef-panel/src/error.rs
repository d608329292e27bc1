//! Error types for the panel.

use crate::api_client::ApiClientError;
use crate::config::ConfigError;
use searchdef_core::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error(transparent)]
    Persistence(#[from] StorageError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Panel is not bound to a note")]
    NotBound,
}
