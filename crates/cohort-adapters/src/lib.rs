//! Input adapters: the roster decoder and the two enrichment sources
//! (public profile scrape, coding-judge statistics).

use async_trait::async_trait;
use cohort_core::{JudgeStats, ProfileSummary};
use scraper::{ElementRef, Html, Selector};

pub mod judge;
pub mod profile;
pub mod roster;

pub use judge::{HttpJudgeStatsFetcher, JudgeError};
pub use profile::{HttpProfileEnricher, ProfileEndpoints, ProfileError};
pub use roster::{decode_roster_file, decode_sessions_file, DecodeError, RecordDecoder};

pub const CRATE_NAME: &str = "cohort-adapters";

/// Scrapes a profile handle into a summary with pinned repositories.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    fn source_id(&self) -> &'static str;

    async fn enrich(&self, handle: &str) -> Result<ProfileSummary, ProfileError>;
}

/// Looks up coding-judge statistics. Exhausted retries yield
/// [`JudgeStats::unknown`], never an error.
#[async_trait]
pub trait JudgeStatsSource: Send + Sync {
    fn source_id(&self) -> &'static str;

    async fn fetch(&self, handle: &str) -> Result<JudgeStats, JudgeError>;
}

fn text_or_none(value: String) -> Option<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, String> {
    Selector::parse(selector).map_err(|e| format!("invalid selector {selector:?}: {e}"))
}

fn select_first_text(document: &Html, selector: &str) -> Result<Option<String>, String> {
    let sel = parse_selector(selector)?;
    Ok(document
        .select(&sel)
        .next()
        .and_then(|n| text_or_none(n.text().collect::<String>())))
}

fn select_child_text(element: &ElementRef<'_>, selector: &str) -> Result<Option<String>, String> {
    let sel = parse_selector(selector)?;
    Ok(element
        .select(&sel)
        .next()
        .and_then(|n| text_or_none(n.text().collect::<String>())))
}
