//! Ingestion run orchestration.
//!
//! A run moves through `Idle -> Decoding -> Joined -> PerRecordEnrichment ->
//! Persisting -> Done`, or to `Failed` from whichever stage hit a fatal error.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cohort_adapters::{decode_roster_file, decode_sessions_file, DecodeError};
use cohort_core::{MentorSessionRecord, StudentRecord};
use cohort_storage::{RetryPolicy, StoreError};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

mod ingestor;

pub use ingestor::{EnrichedRecord, PersistReport, RecordIngestor};

pub const CRATE_NAME: &str = "cohort-sync";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub database_url: String,
    pub roster_path: PathBuf,
    pub sessions_path: PathBuf,
    pub resume_dir: PathBuf,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub profile_base_url: String,
    pub profile_api_base_url: String,
    pub profile_api_token: Option<String>,
    pub judge_stats_url: String,
    pub judge_max_attempts: usize,
    pub judge_backoff_secs: u64,
    pub enrich_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://cohort.db".to_string(),
            roster_path: PathBuf::from("data.csv"),
            sessions_path: PathBuf::from("mentor_sesh.csv"),
            resume_dir: PathBuf::from("resumes"),
            user_agent: "cohort-board/0.1".to_string(),
            http_timeout_secs: 20,
            profile_base_url: "https://github.com".to_string(),
            profile_api_base_url: "https://api.github.com".to_string(),
            profile_api_token: None,
            judge_stats_url: "http://localhost:8080".to_string(),
            judge_max_attempts: 3,
            judge_backoff_secs: 2,
            enrich_concurrency: 4,
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            database_url: env_or("DATABASE_URL", d.database_url),
            roster_path: std::env::var("ROSTER_CSV")
                .map(PathBuf::from)
                .unwrap_or(d.roster_path),
            sessions_path: std::env::var("MENTOR_SESSIONS_CSV")
                .map(PathBuf::from)
                .unwrap_or(d.sessions_path),
            resume_dir: std::env::var("RESUME_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.resume_dir),
            user_agent: env_or("COHORT_USER_AGENT", d.user_agent),
            http_timeout_secs: env_parse("COHORT_HTTP_TIMEOUT_SECS", d.http_timeout_secs),
            profile_base_url: env_or("PROFILE_BASE_URL", d.profile_base_url),
            profile_api_base_url: env_or("PROFILE_API_BASE_URL", d.profile_api_base_url),
            profile_api_token: std::env::var("PROFILE_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            judge_stats_url: env_or("JUDGE_STATS_URL", d.judge_stats_url),
            judge_max_attempts: env_parse("JUDGE_MAX_ATTEMPTS", d.judge_max_attempts),
            judge_backoff_secs: env_parse("JUDGE_BACKOFF_SECS", d.judge_backoff_secs),
            enrich_concurrency: env_parse("ENRICH_CONCURRENCY", d.enrich_concurrency),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.judge_max_attempts.max(1),
            delay: Duration::from_secs(self.judge_backoff_secs),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("mentor for {student_id} could not be resolved: {source}")]
    MentorUnresolved {
        student_id: String,
        #[source]
        source: StoreError,
    },

    #[error("student {0} already exists")]
    AlreadyIngested(String),

    #[error("writing student {student_id}: {source}")]
    StudentWrite {
        student_id: String,
        #[source]
        source: StoreError,
    },

    #[error("writing mentor session for {student_id} on {date}: {source}")]
    SessionWrite {
        student_id: String,
        date: String,
        #[source]
        source: StoreError,
    },

    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("{stage} worker failed: {reason}")]
    Worker { stage: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Idle,
    Decoding,
    Joined,
    PerRecordEnrichment,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::Idle => "idle",
            IngestStage::Decoding => "decoding",
            IngestStage::Joined => "joined",
            IngestStage::PerRecordEnrichment => "per_record_enrichment",
            IngestStage::Persisting => "persisting",
            IngestStage::Done => "done",
            IngestStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct StageTracker {
    current: IngestStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            current: IngestStage::Idle,
        }
    }

    fn advance(&mut self, next: IngestStage) {
        info!(from = %self.current, to = %next, "ingest stage");
        self.current = next;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub decoded: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub already_present: usize,
    pub degraded: usize,
    pub child_write_failures: usize,
    pub sessions_written: usize,
    pub sessions_skipped: usize,
}

enum Decoded {
    Roster(Vec<StudentRecord>),
    Sessions(Vec<MentorSessionRecord>),
}

type EnrichOutcome = Result<EnrichedRecord, IngestError>;

pub struct IngestPipeline {
    ingestor: Arc<RecordIngestor>,
    roster_path: PathBuf,
    sessions_path: PathBuf,
    concurrency: usize,
}

impl IngestPipeline {
    pub fn new(
        ingestor: Arc<RecordIngestor>,
        roster_path: impl Into<PathBuf>,
        sessions_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ingestor,
            roster_path: roster_path.into(),
            sessions_path: sessions_path.into(),
            concurrency: 4,
        }
    }

    /// Pipeline over the configured input files and worker-pool size.
    pub fn from_config(ingestor: Arc<RecordIngestor>, config: &SyncConfig) -> Self {
        Self::new(ingestor, &config.roster_path, &config.sessions_path)
            .with_concurrency(config.enrich_concurrency)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(&self) -> Result<IngestSummary, IngestError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("ingest_run", %run_id);

        async move {
            let mut stages = StageTracker::new();
            match self.run_stages(&mut stages, run_id, started_at).await {
                Ok(summary) => {
                    stages.advance(IngestStage::Done);
                    info!(
                        decoded = summary.decoded,
                        persisted = summary.persisted,
                        skipped = summary.skipped,
                        already_present = summary.already_present,
                        degraded = summary.degraded,
                        sessions = summary.sessions_written,
                        "ingestion complete"
                    );
                    Ok(summary)
                }
                Err(err) => {
                    error!(stage = %stages.current, error = %err, "ingestion failed");
                    stages.advance(IngestStage::Failed);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        stages: &mut StageTracker,
        run_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<IngestSummary, IngestError> {
        stages.advance(IngestStage::Decoding);
        let (roster, sessions) = self.decode_inputs().await?;

        stages.advance(IngestStage::Joined);
        info!(students = roster.len(), sessions = sessions.len(), "inputs decoded");
        let decoded = roster.len();

        stages.advance(IngestStage::PerRecordEnrichment);
        let outcomes = self.enrich_all(roster).await?;

        stages.advance(IngestStage::Persisting);
        let mut summary = IngestSummary {
            run_id,
            started_at,
            finished_at: started_at,
            decoded,
            persisted: 0,
            skipped: 0,
            already_present: 0,
            degraded: 0,
            child_write_failures: 0,
            sessions_written: 0,
            sessions_skipped: 0,
        };

        for outcome in outcomes {
            match outcome {
                Ok(record) => match self.ingestor.persist(&record).await {
                    Ok(report) => {
                        summary.persisted += 1;
                        if report.degraded {
                            summary.degraded += 1;
                        }
                        summary.child_write_failures += report.child_failures;
                    }
                    Err(IngestError::AlreadyIngested(student_id)) => {
                        warn!(%student_id, "skipping record: student already stored");
                        summary.already_present += 1;
                    }
                    Err(err) => return Err(err),
                },
                Err(IngestError::MentorUnresolved { student_id, source }) => {
                    warn!(%student_id, error = %source, "skipping record: mentor unresolved");
                    summary.skipped += 1;
                }
                Err(IngestError::AlreadyIngested(student_id)) => {
                    info!(%student_id, "student already stored");
                    summary.already_present += 1;
                }
                Err(err) => return Err(err),
            }
        }

        for session in &sessions {
            if self.ingestor.persist_session(session).await? {
                summary.sessions_written += 1;
            } else {
                summary.sessions_skipped += 1;
            }
        }

        summary.finished_at = Utc::now();
        Ok(summary)
    }

    /// Decodes both inputs on blocking workers. The first error aborts the
    /// other worker and ends the run.
    async fn decode_inputs(
        &self,
    ) -> Result<(Vec<StudentRecord>, Vec<MentorSessionRecord>), IngestError> {
        let (tx, mut rx) = mpsc::channel::<Result<Decoded, DecodeError>>(2);

        let roster_path = self.roster_path.clone();
        let roster_tx = tx.clone();
        let roster_worker = tokio::task::spawn_blocking(move || {
            let result = decode_roster_file(&roster_path).map(Decoded::Roster);
            let _ = roster_tx.blocking_send(result);
        });

        let sessions_path = self.sessions_path.clone();
        let sessions_worker = tokio::task::spawn_blocking(move || {
            let result = decode_sessions_file(&sessions_path).map(Decoded::Sessions);
            let _ = tx.blocking_send(result);
        });

        let workers = [roster_worker, sessions_worker];
        let mut roster = None;
        let mut sessions = None;
        while roster.is_none() || sessions.is_none() {
            match rx.recv().await {
                Some(Ok(Decoded::Roster(records))) => roster = Some(records),
                Some(Ok(Decoded::Sessions(records))) => sessions = Some(records),
                Some(Err(err)) => {
                    for worker in &workers {
                        worker.abort();
                    }
                    return Err(err.into());
                }
                None => {
                    return Err(IngestError::Worker {
                        stage: "decode",
                        reason: "decoder exited without a result".to_string(),
                    })
                }
            }
        }

        match (roster, sessions) {
            (Some(roster), Some(sessions)) => Ok((roster, sessions)),
            _ => Err(IngestError::Worker {
                stage: "decode",
                reason: "missing decoder output".to_string(),
            }),
        }
    }

    /// Enriches every record on a bounded pool and returns the outcomes in
    /// roster order.
    async fn enrich_all(&self, roster: Vec<StudentRecord>) -> Result<Vec<EnrichOutcome>, IngestError> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let total = roster.len();
        let mut tasks = JoinSet::new();

        for (index, record) in roster.into_iter().enumerate() {
            let ingestor = Arc::clone(&self.ingestor);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => ingestor.enrich_new(&record).await,
                    Err(_) => Err(IngestError::Worker {
                        stage: "enrichment",
                        reason: "worker pool closed".to_string(),
                    }),
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<EnrichOutcome>> = std::iter::repeat_with(|| None).take(total).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = joined.map_err(|e| IngestError::Worker {
                stage: "enrichment",
                reason: e.to_string(),
            })?;
            slots[index] = Some(outcome);
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| IngestError::Worker {
                    stage: "enrichment",
                    reason: "record produced no outcome".to_string(),
                })
            })
            .collect()
    }
}
