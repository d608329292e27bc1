//! REST client for the note server.

use crate::cache::NoteFetcher;
use crate::config::{AuthConfig, PanelConfig};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use searchdef_core::{
    Attribute, Note, NoteAutocomplete, NoteId, NoteStore, NoteSuggestion, StorageError,
    StorageResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Config error: {0}")]
    Config(String),
}

#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct ChangeTitleRequest<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct AutocompleteQuery<'a> {
    query: &'a str,
}

/// One row of the server's autocomplete response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutocompleteItem {
    note_path: String,
    note_title: Option<String>,
    note_path_title: String,
}

impl AutocompleteItem {
    fn into_suggestion(self) -> Option<NoteSuggestion> {
        let note_id = self.note_path.rsplit('/').next().and_then(NoteId::parse)?;
        Some(NoteSuggestion {
            note_id,
            title: self.note_title.unwrap_or(self.note_path_title),
        })
    }
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: Url,
    auth_header: HeaderMap,
}

impl RestClient {
    pub fn new(config: &PanelConfig) -> Result<Self, ApiClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let auth_header = build_auth_headers(&config.auth)?;
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| ApiClientError::Config(format!("api_base_url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiClientError::Config(format!(
                "api_base_url: {} cannot carry a path",
                base_url
            )));
        }
        Ok(Self {
            client,
            base_url,
            auth_header,
        })
    }

    /// `base_url` extended by `segments`, each percent-encoded as one path
    /// segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn get_note(&self, note_id: &NoteId) -> Result<Option<Note>, ApiClientError> {
        let url = self.endpoint(&["notes", note_id.as_str()]);
        let response = self
            .client
            .get(url)
            .headers(self.auth_header.clone())
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        Ok(Some(response.json::<Note>().await?))
    }

    pub async fn put_attributes(
        &self,
        note_id: &NoteId,
        attributes: &[Attribute],
    ) -> Result<(), ApiClientError> {
        let url = self.endpoint(&["notes", note_id.as_str(), "attributes"]);
        self.put_json(url, attributes).await
    }

    pub async fn change_title(&self, note_id: &NoteId, title: &str) -> Result<(), ApiClientError> {
        let url = self.endpoint(&["notes", note_id.as_str(), "change-title"]);
        self.put_json(url, &ChangeTitleRequest { title }).await
    }

    pub async fn autocomplete(&self, query: &str) -> Result<Vec<NoteSuggestion>, ApiClientError> {
        let url = self.endpoint(&["autocomplete"]);
        let response = self
            .client
            .get(url)
            .headers(self.auth_header.clone())
            .query(&AutocompleteQuery { query })
            .send()
            .await?;
        let items = check_status(response)
            .await?
            .json::<Vec<AutocompleteItem>>()
            .await?;
        Ok(items
            .into_iter()
            .filter_map(AutocompleteItem::into_suggestion)
            .collect())
    }

    async fn put_json<B>(&self, url: Url, body: &B) -> Result<(), ApiClientError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .put(url)
            .headers(self.auth_header.clone())
            .json(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await?;
    if let Ok(body) = serde_json::from_str::<ServerErrorBody>(&text) {
        return Err(ApiClientError::InvalidResponse(format!(
            "HTTP {}: {}",
            status.as_u16(),
            body.message
        )));
    }
    Err(ApiClientError::InvalidResponse(format!(
        "HTTP {}: {}",
        status.as_u16(),
        text
    )))
}

fn build_auth_headers(auth: &AuthConfig) -> Result<HeaderMap, ApiClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    if let Some(jwt) = &auth.jwt {
        let value = format!("Bearer {}", jwt);
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    Ok(headers)
}

#[async_trait]
impl NoteStore for RestClient {
    async fn put_attributes(&self, note_id: &NoteId, attributes: &[Attribute]) -> StorageResult<()> {
        RestClient::put_attributes(self, note_id, attributes)
            .await
            .map_err(|e| StorageError::AttributeWriteFailed {
                note_id: note_id.clone(),
                reason: e.to_string(),
            })
    }

    async fn put_title(&self, note_id: &NoteId, title: &str) -> StorageResult<()> {
        self.change_title(note_id, title)
            .await
            .map_err(|e| StorageError::TitleWriteFailed {
                note_id: note_id.clone(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl NoteFetcher for RestClient {
    async fn fetch_note(&self, note_id: &NoteId) -> StorageResult<Option<Note>> {
        self.get_note(note_id)
            .await
            .map_err(|e| StorageError::FetchFailed {
                note_id: note_id.clone(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl NoteAutocomplete for RestClient {
    async fn autocomplete(&self, query: &str) -> StorageResult<Vec<NoteSuggestion>> {
        RestClient::autocomplete(self, query)
            .await
            .map_err(|e| StorageError::Unavailable {
                reason: e.to_string(),
            })
    }
}
