use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use crate::api::{ApiError, EditorApi};
use crate::models::{DocumentPayload, PartialsPayload};

const CONTENT_ENDPOINT: &str = "_grow/api/editor/content";
const PARTIALS_ENDPOINT: &str = "_grow/api/editor/partials";

/// [`EditorApi`] over the preview server's JSON endpoints.
#[derive(Debug, Clone)]
pub struct HttpEditorApi {
    client: reqwest::Client,
    root: Url,
}

impl HttpEditorApi {
    pub fn new(root: &str) -> Result<Self, ApiError> {
        Self::with_client(reqwest::Client::new(), root)
    }

    pub fn for_host(host: &str, port: u16) -> Result<Self, ApiError> {
        Self::new(&format!("http://{host}:{port}/"))
    }

    pub fn with_client(client: reqwest::Client, root: &str) -> Result<Self, ApiError> {
        let mut root = Url::parse(root)?;
        // `Url::join` replaces the last segment unless the base ends in '/'.
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        Ok(Self { client, root })
    }

    pub fn content_url(&self, pod_path: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self.root.join(CONTENT_ENDPOINT)?;
        if let Some(pod_path) = pod_path {
            url.query_pairs_mut().append_pair("pod_path", pod_path);
        }
        Ok(url)
    }

    pub fn partials_url(&self) -> Result<Url, ApiError> {
        Ok(self.root.join(PARTIALS_ENDPOINT)?)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn post_content(&self, body: &Value) -> Result<DocumentPayload, ApiError> {
        let url = self.content_url(None)?;
        log::debug!("POST {url}");
        let response = self.client.post(url).json(body).send().await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl EditorApi for HttpEditorApi {
    async fn get_document(&self, pod_path: &str) -> Result<DocumentPayload, ApiError> {
        let url = self.content_url(Some(pod_path))?;
        log::debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    async fn get_partials(&self) -> Result<PartialsPayload, ApiError> {
        let url = self.partials_url()?;
        log::debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    async fn save_document_fields(
        &self,
        pod_path: &str,
        front_matter: &Value,
        locale: Option<&str>,
    ) -> Result<DocumentPayload, ApiError> {
        self.post_content(&json!({
            "pod_path": pod_path,
            "front_matter": front_matter,
            "locale": locale,
        }))
        .await
    }

    async fn save_document_source(
        &self,
        pod_path: &str,
        raw_front_matter: &str,
    ) -> Result<DocumentPayload, ApiError> {
        self.post_content(&json!({
            "pod_path": pod_path,
            "raw_front_matter": raw_front_matter,
        }))
        .await
    }
}
