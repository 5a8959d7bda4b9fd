//! Public profile enrichment: scrape the profile page for bio, repository
//! counter and pinned entries, then ask the structured API for each pinned
//! repository's languages.
//!
//! The page fetch is all-or-nothing. Language lookups are per repository and
//! a failed lookup only empties that repository's language set.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use cohort_core::{PinnedRepoSummary, ProfileSummary};
use cohort_storage::{FetchError, HttpFetcher};
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{parse_selector, select_child_text, select_first_text, ProfileSource};

pub const PROFILE_SOURCE_ID: &str = "profile";
pub const PROFILE_API_SOURCE_ID: &str = "profile-api";

const USERNAME_SELECTOR: &str = "span.vcard-username";
const BIO_SELECTOR: &str = "div.user-profile-bio";
const COUNTER_SELECTOR: &str = "span.Counter";
const PINNED_SELECTOR: &str = ".pinned-item-list-item-content";
const PINNED_NAME_SELECTOR: &str = ".repo";
const PINNED_DESC_SELECTOR: &str = "p.pinned-item-desc";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("fetching profile page for {handle}: {source}")]
    Fetch {
        handle: String,
        #[source]
        source: FetchError,
    },
    #[error("page for {0} is not a profile page")]
    NotAProfile(String),
    #[error("{0}")]
    Selector(String),
}

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("language payload is not a json object: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ProfileEndpoints {
    pub profile_base: String,
    pub api_base: String,
    pub api_token: Option<String>,
}

impl Default for ProfileEndpoints {
    fn default() -> Self {
        Self {
            profile_base: "https://github.com".to_string(),
            api_base: "https://api.github.com".to_string(),
            api_token: None,
        }
    }
}

pub struct HttpProfileEnricher {
    http: Arc<HttpFetcher>,
    endpoints: ProfileEndpoints,
}

impl HttpProfileEnricher {
    pub fn new(http: Arc<HttpFetcher>, endpoints: ProfileEndpoints) -> Self {
        Self { http, endpoints }
    }

    fn profile_url(&self, handle: &str) -> String {
        format!("{}/{}", self.endpoints.profile_base.trim_end_matches('/'), handle)
    }

    fn languages_url(&self, handle: &str, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}/languages",
            self.endpoints.api_base.trim_end_matches('/'),
            handle,
            repo
        )
    }

    async fn fetch_languages(&self, handle: &str, repo: &str) -> Result<BTreeSet<String>, LanguageError> {
        let mut headers = vec![("accept", "application/vnd.github+json".to_string())];
        if let Some(token) = &self.endpoints.api_token {
            headers.push(("authorization", format!("token {token}")));
        }
        let resp = self
            .http
            .fetch_once(PROFILE_API_SOURCE_ID, &self.languages_url(handle, repo), &headers)
            .await?;
        Ok(parse_languages(&resp.body)?)
    }
}

#[async_trait]
impl ProfileSource for HttpProfileEnricher {
    fn source_id(&self) -> &'static str {
        PROFILE_SOURCE_ID
    }

    async fn enrich(&self, handle: &str) -> Result<ProfileSummary, ProfileError> {
        let resp = self
            .http
            .fetch_once(PROFILE_SOURCE_ID, &self.profile_url(handle), &[])
            .await
            .map_err(|source| ProfileError::Fetch {
                handle: handle.to_string(),
                source,
            })?;
        let html = String::from_utf8_lossy(&resp.body);
        let mut summary = parse_profile_page(&html, handle)?;

        for repo in &mut summary.pinned {
            match self.fetch_languages(handle, &repo.name).await {
                Ok(languages) => repo.languages = languages,
                Err(err) => {
                    warn!(handle, repo = %repo.name, error = %err, "language lookup failed; keeping repository without languages");
                    repo.languages.clear();
                }
            }
        }
        debug!(handle, pinned = summary.pinned.len(), "profile enriched");
        Ok(summary)
    }
}

/// Extracts the profile summary from page markup. Pinned entries come back
/// with empty language sets.
pub fn parse_profile_page(html: &str, requested_handle: &str) -> Result<ProfileSummary, ProfileError> {
    let document = Html::parse_document(html);

    let username = select_first_text(&document, USERNAME_SELECTOR).map_err(ProfileError::Selector)?;
    let bio = select_first_text(&document, BIO_SELECTOR).map_err(ProfileError::Selector)?;
    let counter = select_first_text(&document, COUNTER_SELECTOR).map_err(ProfileError::Selector)?;

    let pinned_sel: Selector = parse_selector(PINNED_SELECTOR).map_err(ProfileError::Selector)?;
    let mut pinned = Vec::new();
    for item in document.select(&pinned_sel) {
        let Some(name) = select_child_text(&item, PINNED_NAME_SELECTOR).map_err(ProfileError::Selector)? else {
            continue;
        };
        let description = select_child_text(&item, PINNED_DESC_SELECTOR)
            .map_err(ProfileError::Selector)?
            .unwrap_or_default();
        pinned.push(PinnedRepoSummary {
            name,
            description,
            languages: BTreeSet::new(),
        });
    }

    if username.is_none() && pinned.is_empty() {
        return Err(ProfileError::NotAProfile(requested_handle.to_string()));
    }

    Ok(ProfileSummary {
        handle: username.unwrap_or_else(|| requested_handle.to_string()),
        bio: bio.unwrap_or_default(),
        public_repo_count: counter.as_deref().and_then(parse_counter),
        pinned,
    })
}

/// `{"Rust": 1200, "Shell": 40}` -> `{"Rust", "Shell"}`. Byte counts are dropped.
pub fn parse_languages(body: &[u8]) -> Result<BTreeSet<String>, serde_json::Error> {
    let weights: BTreeMap<String, serde_json::Value> = serde_json::from_slice(body)?;
    Ok(weights.into_keys().collect())
}

/// Reads counters as rendered on profile pages: `12`, `1,204`, `1.2k`.
pub fn parse_counter(raw: &str) -> Option<i64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let lower = cleaned.to_ascii_lowercase();
    if let Some(thousands) = lower.strip_suffix('k') {
        let value: f64 = thousands.parse().ok()?;
        return Some((value * 1000.0).round() as i64);
    }
    lower.parse().ok()
}
