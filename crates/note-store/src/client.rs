//! Note store HTTP client.
//!
//! Async client using `reqwest` with bearer token authentication.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::index::{default_index_title, index_path, render_index_page};
use crate::types::{
    ApiResponse, FrontmatterPatched, FrontmatterWrite, IndexEnsured, NoteSaved, NoteWrite,
};

/// Errors from the note store client.
#[derive(Debug, thiserror::Error)]
pub enum NoteStoreError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid token")]
    InvalidToken,

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Note store API client bound to one vault.
pub struct NoteStoreClient {
    http: reqwest::Client,
    base_url: String,
    vault: String,
}

impl NoteStoreClient {
    /// Creates a client for `base_url` (without the `/api` suffix).
    pub fn new(base_url: &str, token: &str, vault: &str) -> Result<Self, NoteStoreError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(NoteStoreError::InvalidBaseUrl(base_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| NoteStoreError::InvalidToken)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            vault: vault.to_string(),
        })
    }

    pub fn vault(&self) -> &str {
        &self.vault
    }

    /// Sends a JSON body and parses the reply envelope.
    async fn send<B: Serialize>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        body: &B,
    ) -> Result<ApiResponse, NoteStoreError> {
        let url = format!("{}/api{endpoint}", self.base_url);
        debug!(%method, %url, "note store request");

        let resp = self.http.request(method, &url).json(body).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            return Err(NoteStoreError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ApiResponse::default());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Creates the note at `path`, or replaces its content.
    pub async fn create_or_update_note(
        &self,
        path: &str,
        content: &str,
    ) -> Result<NoteSaved, NoteStoreError> {
        let body = NoteWrite {
            vault: &self.vault,
            path,
            content,
        };
        let resp = self.send(reqwest::Method::POST, "/note", &body).await?;
        let saved = NoteSaved::from_response(path, resp);
        info!(path, version = %saved.version, "note saved");
        Ok(saved)
    }

    /// Sets the given frontmatter fields without touching the note body.
    pub async fn patch_frontmatter(
        &self,
        path: &str,
        updates: Map<String, Value>,
    ) -> Result<FrontmatterPatched, NoteStoreError> {
        let body = FrontmatterWrite {
            vault: &self.vault,
            path,
            updates: &updates,
        };
        self.send(reqwest::Method::PATCH, "/note/frontmatter", &body)
            .await?;
        info!(path, fields = updates.len(), "frontmatter updated");
        Ok(FrontmatterPatched {
            success: true,
            path: path.to_string(),
            updates,
        })
    }

    /// Writes the Dataview index page of `folder`, overwriting any
    /// existing one. The title defaults to one derived from the folder.
    pub async fn ensure_index_page(
        &self,
        folder: &str,
        title: Option<&str>,
    ) -> Result<IndexEnsured, NoteStoreError> {
        let folder = folder.trim_end_matches('/');
        let title = title.map_or_else(|| default_index_title(folder), str::to_string);
        let path = index_path(folder);
        let content = render_index_page(folder, &title);

        let body = NoteWrite {
            vault: &self.vault,
            path: &path,
            content: &content,
        };
        self.send(reqwest::Method::POST, "/note", &body).await?;
        info!(path = %path, "index page written");
        Ok(IndexEnsured {
            success: true,
            path,
        })
    }
}
