//! Relational store + HTTP fetch utilities for the cohort board.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info_span, warn, Instrument};

pub mod db;

pub use db::{Database, LeaderboardEntry, StoreError, TableCounts};

pub const CRATE_NAME: &str = "cohort-storage";

/// Fixed-interval retry: `max_attempts` tries in total, `delay` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub global_concurrency: usize,
    pub per_source_concurrency: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
            global_concurrency: 16,
            per_source_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: Box<FetchError> },
}

/// Shared reqwest client with global and per-source concurrency limits.
/// Sources are coarse labels ("profile", "profile-api", "judge") so one slow
/// upstream cannot starve the others.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    global_limit: Arc<Semaphore>,
    per_source_limit: usize,
    per_source: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;

        Ok(Self {
            client,
            global_limit: Arc::new(Semaphore::new(config.global_concurrency.max(1))),
            per_source_limit: config.per_source_concurrency.max(1),
            per_source: Mutex::new(HashMap::new()),
        })
    }

    async fn per_source_semaphore(&self, source_id: &str) -> Arc<Semaphore> {
        let mut map = self.per_source.lock().await;
        map.entry(source_id.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_source_limit)))
            .clone()
    }

    /// One GET. Non-success statuses come back as [`FetchError::HttpStatus`].
    pub async fn fetch_once(
        &self,
        source_id: &str,
        url: &str,
        headers: &[(&str, String)],
    ) -> Result<FetchedResponse, FetchError> {
        let header_map = build_headers(headers)?;
        let span = info_span!("http_fetch", source_id, url);
        self.send(source_id, url, header_map).instrument(span).await
    }

    /// GET with a fixed retry loop. Any transport error or non-success status
    /// is retried until the policy runs out, then [`FetchError::Exhausted`].
    pub async fn fetch_with_retry(
        &self,
        source_id: &str,
        url: &str,
        headers: &[(&str, String)],
        policy: &RetryPolicy,
    ) -> Result<FetchedResponse, FetchError> {
        let header_map = build_headers(headers)?;
        let attempts = policy.max_attempts.max(1);
        let span = info_span!("http_fetch_retry", source_id, url, attempts);

        async move {
            let mut last_error = None;
            for attempt in 1..=attempts {
                match self.send(source_id, url, header_map.clone()).await {
                    Ok(resp) => return Ok(resp),
                    Err(err) => {
                        warn!(attempt, error = %err, "fetch attempt failed");
                        last_error = Some(err);
                    }
                }
                if attempt < attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(FetchError::Exhausted {
                attempts,
                last: Box::new(last_error.expect("retry loop runs at least once")),
            })
        }
        .instrument(span)
        .await
    }

    async fn send(
        &self,
        source_id: &str,
        url: &str,
        headers: HeaderMap,
    ) -> Result<FetchedResponse, FetchError> {
        let _global = self.global_limit.acquire().await.expect("semaphore not closed");
        let per_source = self.per_source_semaphore(source_id).await;
        let _source = per_source.acquire().await.expect("semaphore not closed");

        let resp = self.client.get(url).headers(headers).send().await?;
        let status = resp.status();
        let final_url = resp.url().to_string();
        debug!(status = status.as_u16(), "response received");

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let body = resp.bytes().await?.to_vec();
        Ok(FetchedResponse {
            status,
            final_url,
            body,
        })
    }
}

fn build_headers(headers: &[(&str, String)]) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| FetchError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
