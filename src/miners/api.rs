use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tokio::time::timeout;
use tracing::warn;
use url::Url;

/// How much of an unparseable body is kept for diagnostics. Never log the
/// full body; some firmware responses are large.
const EXCERPT_LEN: usize = 80;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("malformed json: {excerpt}")]
    MalformedJson { excerpt: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("no data")]
    EmptyResult,
    #[error("{0}")]
    Unexpected(String),
}

/// Seam between the poller and the network, so polling logic can be
/// exercised against canned payloads.
#[async_trait]
pub trait FetchJson: Send + Sync {
    /// Fetch `url` and parse the sanitized body as JSON.
    async fn fetch_json(&self, url: &Url) -> Result<Value, FetchError>;
}

/// HTTP fetcher tolerant of devices that embed control or null bytes in
/// otherwise valid JSON text.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            timeout: request_timeout,
        }
    }

    async fn execute(&self, url: &Url) -> Result<Value, FetchError> {
        let response = timeout(self.timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let text = sanitize_body(&body);
        serde_json::from_str(&text).map_err(|_| FetchError::MalformedJson {
            excerpt: excerpt(&text),
        })
    }
}

#[async_trait]
impl FetchJson for HttpFetcher {
    async fn fetch_json(&self, url: &Url) -> Result<Value, FetchError> {
        let result = self.execute(url).await;
        if let Err(err) = &result {
            warn!(%url, %err, "fetch failed");
        }
        result
    }
}

/// Strips every byte outside printable ASCII plus tab, newline and carriage
/// return.
pub fn sanitize_body(body: &[u8]) -> String {
    body.iter()
        .copied()
        .filter(|b| matches!(*b, 0x20..=0x7E | b'\t' | b'\n' | b'\r'))
        .map(char::from)
        .collect()
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_LEN).collect()
}
