//! Conditional HTTP fetch with ETag validators.
//!
//! A 304 response means "unchanged, reuse the prior payload"; the caller
//! decides what that prior payload is.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use tracing::debug;

/// Grid endpoints are expected to answer quickly; stall out slow upstreams.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// Result of one conditional fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    /// Validator token returned by the upstream, if any.
    pub etag: Option<String>,
    /// Response body; `None` on 304.
    pub body: Option<String>,
    pub duration_ms: u64,
    pub not_modified: bool,
    pub fetched_at: DateTime<Utc>,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Seam for the orchestrator's HTTP dependency; tests use in-memory fakes.
#[async_trait]
pub trait ConditionalFetch: Send + Sync {
    async fn fetch(&self, url: &str, validator: Option<&str>) -> Result<FetchResult>;
}

/// Production fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ConditionalFetch for HttpFetcher {
    async fn fetch(&self, url: &str, validator: Option<&str>) -> Result<FetchResult> {
        let started = Instant::now();

        let mut request = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json");
        if let Some(tag) = validator {
            request = request.header(header::IF_NONE_MATCH, tag);
        }

        let response = request.send().await.context("HTTP request failed")?;
        let status = response.status();
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let not_modified = status == StatusCode::NOT_MODIFIED;
        let body = if not_modified {
            None
        } else {
            Some(
                response
                    .text()
                    .await
                    .context("Failed to read response body")?,
            )
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        debug!(
            url = %url,
            status = status.as_u16(),
            not_modified = not_modified,
            duration_ms = duration_ms,
            "Conditional fetch complete"
        );

        Ok(FetchResult {
            status: status.as_u16(),
            etag,
            body,
            duration_ms,
            not_modified,
            fetched_at: Utc::now(),
        })
    }
}
