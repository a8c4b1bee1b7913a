use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::InsightsError;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// The remote API collaborator. Only plain GETs are needed.
///
/// Implementations report transient failures as [`InsightsError::Retryable`];
/// a non-2xx status is not an error here, the body is classified instead.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, InsightsError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Builds a transport whose requests give up after `timeout`.
    ///
    /// Timed out requests surface as [`InsightsError::Retryable`].
    pub fn with_timeout(timeout: Duration) -> Result<Self, InsightsError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InsightsError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Uses a preconfigured client (proxy, headers, TLS settings).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn map_reqwest_error(err: reqwest::Error) -> InsightsError {
    if err.is_timeout() || err.is_connect() {
        InsightsError::Retryable(err.to_string())
    } else {
        InsightsError::Transport(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, InsightsError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;
        Ok(HttpResponse { status, body })
    }
}
