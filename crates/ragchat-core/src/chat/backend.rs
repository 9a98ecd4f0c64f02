//! Chat backend transport
//!
//! The backend is an opaque remote service: one JSON request in, one
//! complete reply out.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

use super::types::{ChatRequest, ChatResponse, error_detail};

/// A service that answers chat requests
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Perform one request/response exchange
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// HTTP client for the `/api/chat` endpoint
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpBackend {
    /// Create a backend client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = config.timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(client_build_error)?;

        Ok(Self {
            client,
            url: config.chat_url(),
            timeout,
        })
    }

    /// Create with a custom base URL (for testing or custom endpoints)
    pub fn with_base_url(config: &Config, base_url: impl Into<String>) -> Result<Self> {
        let mut config = config.clone();
        config.backend.base_url = base_url.into();
        config.validate()?;
        Self::new(&config)
    }

    /// Endpoint this client posts to
    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Transport(e)
        }
    }
}

/// A client that cannot be built is a setup problem, never a request failure
fn client_build_error(e: reqwest::Error) -> Error {
    Error::Config(format!("Failed to build HTTP client: {}", e))
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!("Sending chat request to {} (useRag={})", self.url, request.use_rag);

        let response = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.request_error(e))?;

        if !status.is_success() {
            warn!("Chat backend error: {} - {}", status, body);
            return Err(Error::Server {
                status: status.as_u16(),
                message: error_detail(&body),
            });
        }

        let parsed = ChatResponse::from_body(&body)?;

        info!(
            "Chat backend response: used_rag={}, context_items={}",
            parsed.used_rag,
            parsed.context.as_ref().map(Vec::len).unwrap_or(0)
        );

        Ok(parsed)
    }
}
