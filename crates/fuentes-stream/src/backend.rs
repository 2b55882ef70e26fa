//! Backend client for the retrieval service

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::{
    error::{Error, Result},
    stream::ByteStream,
    types::{CollectionInfo, CollectionList, QueryRequest},
};

/// Default backend address
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Trait for retrieval backends
#[async_trait]
pub trait Backend: Send + Sync {
    /// Submit a query and return the raw answer body.
    ///
    /// A non-2xx answer is an error; the body is never handed out.
    async fn query(&self, request: &QueryRequest) -> Result<ByteStream>;

    /// List the collections available for search
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;
}

/// HTTP client for the retrieval backend
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client with a connect timeout
    pub fn with_connect_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().connect_timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    /// Create from an existing reqwest client
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "backend URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Turn a non-2xx response into a status error
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::status(status.as_u16(), body))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn query(&self, request: &QueryRequest) -> Result<ByteStream> {
        tracing::debug!(
            "POST {} ({} collections)",
            self.url("query"),
            request.collections.len()
        );

        let response = self
            .client
            .post(self.url("query"))
            .header("accept", "text/event-stream")
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(Box::pin(
            response.bytes_stream().map(|chunk| chunk.map_err(Error::from)),
        ))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let response = self
            .client
            .get(self.url("qdrant-collections"))
            .send()
            .await?;
        let response = check_status(response).await?;
        let list: CollectionList = response.json().await?;
        Ok(list.collections)
    }
}
