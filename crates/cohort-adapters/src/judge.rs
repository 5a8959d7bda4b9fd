//! Coding-judge statistics over the stats service's JSON endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use cohort_core::JudgeStats;
use cohort_storage::{HttpFetcher, RetryPolicy};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::JudgeStatsSource;

pub const JUDGE_SOURCE_ID: &str = "judge";

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("malformed judge stats for {handle}: {source}")]
    Parse {
        handle: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsPayload {
    #[serde(default)]
    ranking: Option<i64>,
    easy_solved: i64,
    medium_solved: i64,
    hard_solved: i64,
}

impl From<StatsPayload> for JudgeStats {
    fn from(p: StatsPayload) -> Self {
        JudgeStats {
            rank: p.ranking.unwrap_or(0),
            easy: p.easy_solved,
            medium: p.medium_solved,
            hard: p.hard_solved,
        }
    }
}

pub fn parse_stats(handle: &str, body: &[u8]) -> Result<JudgeStats, JudgeError> {
    serde_json::from_slice::<StatsPayload>(body)
        .map(JudgeStats::from)
        .map_err(|source| JudgeError::Parse {
            handle: handle.to_string(),
            source,
        })
}

pub struct HttpJudgeStatsFetcher {
    http: Arc<HttpFetcher>,
    base_url: String,
    policy: RetryPolicy,
}

impl HttpJudgeStatsFetcher {
    pub fn new(http: Arc<HttpFetcher>, base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            policy,
        }
    }

    fn stats_url(&self, handle: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), handle)
    }
}

#[async_trait]
impl JudgeStatsSource for HttpJudgeStatsFetcher {
    fn source_id(&self) -> &'static str {
        JUDGE_SOURCE_ID
    }

    async fn fetch(&self, handle: &str) -> Result<JudgeStats, JudgeError> {
        let resp = match self
            .http
            .fetch_with_retry(JUDGE_SOURCE_ID, &self.stats_url(handle), &[], &self.policy)
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!(handle, error = %err, "judge stats unavailable; recording unknown");
                return Ok(JudgeStats::unknown());
            }
        };
        let stats = parse_stats(handle, &resp.body)?;
        debug!(handle, rank = stats.rank, total = stats.total(), "judge stats fetched");
        Ok(stats)
    }
}
