//! The server collaborator the editor talks to.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{DocumentPayload, PartialsPayload};

pub use http::HttpEditorApi;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned {status} for {url}")]
    Status { status: u16, url: String },
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Other(String),
}

/// Asynchronous, single-shot calls against the editor endpoints. Every
/// document call resolves with the full canonical document shape.
#[async_trait]
pub trait EditorApi: Send + Sync {
    async fn get_document(&self, pod_path: &str) -> Result<DocumentPayload, ApiError>;

    async fn get_partials(&self) -> Result<PartialsPayload, ApiError>;

    async fn save_document_fields(
        &self,
        pod_path: &str,
        front_matter: &Value,
        locale: Option<&str>,
    ) -> Result<DocumentPayload, ApiError>;

    async fn save_document_source(
        &self,
        pod_path: &str,
        raw_front_matter: &str,
    ) -> Result<DocumentPayload, ApiError>;
}
