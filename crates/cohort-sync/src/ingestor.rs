//! Per-record enrichment and persistence, shared by the batch pipeline and the
//! ad-hoc insert endpoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cohort_adapters::{
    HttpJudgeStatsFetcher, HttpProfileEnricher, JudgeStatsSource, ProfileEndpoints, ProfileSource,
};
use cohort_core::{
    handle_from_url, judge_handle_from_url, JudgeAccount, JudgeStats, MentorSession,
    MentorSessionRecord, PinnedRepository, ProfileAccount, Student, StudentRecord,
};
use cohort_storage::{Database, HttpClientConfig, HttpFetcher, StoreError};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{IngestError, SyncConfig};

/// A student row plus whatever child rows enrichment produced for it.
#[derive(Debug, Clone)]
pub struct EnrichedRecord {
    pub student: Student,
    pub profile: Option<(ProfileAccount, Vec<PinnedRepository>)>,
    pub judge: Option<(JudgeAccount, JudgeStats)>,
    pub degraded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub student_id: String,
    pub profile_written: bool,
    pub pinned_written: usize,
    pub judge_written: bool,
    pub problem_id: Option<i64>,
    pub child_failures: usize,
    pub degraded: bool,
}

pub struct RecordIngestor {
    db: Database,
    profile: Arc<dyn ProfileSource>,
    judge: Arc<dyn JudgeStatsSource>,
    resume_dir: PathBuf,
}

impl RecordIngestor {
    pub fn new(
        db: Database,
        profile: Arc<dyn ProfileSource>,
        judge: Arc<dyn JudgeStatsSource>,
        resume_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db,
            profile,
            judge,
            resume_dir: resume_dir.into(),
        }
    }

    /// Wires the HTTP-backed sources from configuration.
    pub fn from_config(db: Database, config: &SyncConfig) -> anyhow::Result<Self> {
        let http = HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(config.http_timeout_secs),
            user_agent: Some(config.user_agent.clone()),
            per_source_concurrency: config.enrich_concurrency.max(1),
            ..Default::default()
        })
        .context("building http client")?;
        let http = Arc::new(http);

        let profile = HttpProfileEnricher::new(
            Arc::clone(&http),
            ProfileEndpoints {
                profile_base: config.profile_base_url.clone(),
                api_base: config.profile_api_base_url.clone(),
                api_token: config.profile_api_token.clone(),
            },
        );
        let judge =
            HttpJudgeStatsFetcher::new(http, config.judge_stats_url.clone(), config.retry_policy());

        Ok(Self::new(
            db,
            Arc::new(profile),
            Arc::new(judge),
            config.resume_dir.clone(),
        ))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn resume_path(&self, reference: &str) -> String {
        let reference = reference.trim();
        if reference.is_empty() {
            return String::new();
        }
        let path = Path::new(reference);
        if path.is_absolute() {
            reference.to_string()
        } else {
            self.resume_dir.join(path).display().to_string()
        }
    }

    /// Resolves the mentor and gathers profile and judge data for one record.
    /// Only an unresolved mentor or a storage failure is an error; source
    /// failures mark the record degraded.
    pub async fn enrich(&self, record: &StudentRecord) -> Result<EnrichedRecord, IngestError> {
        let span = info_span!("enrich_record", student_id = %record.student_id);
        self.enrich_inner(record).instrument(span).await
    }

    async fn enrich_inner(&self, record: &StudentRecord) -> Result<EnrichedRecord, IngestError> {
        let mentor_id = self
            .db
            .resolve_mentor(&record.mentor_name)
            .await
            .map_err(|source| match source {
                StoreError::NotFound(_) | StoreError::InvalidInput(_) => {
                    IngestError::MentorUnresolved {
                        student_id: record.student_id.clone(),
                        source,
                    }
                }
                other => IngestError::Store(other),
            })?;

        let student = Student::from_record(record, mentor_id, self.resume_path(&record.resume_reference));
        let mut degraded = false;

        let profile = match self.profile_rows(record).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(source = self.profile.source_id(), error = %err, "profile enrichment degraded");
                degraded = true;
                None
            }
        };

        let judge = match self.judge_rows(record).await {
            Ok(Some((account, stats))) => {
                if stats.is_unknown() {
                    warn!(source = self.judge.source_id(), handle = %account.handle, "judge stats unknown");
                    degraded = true;
                }
                Some((account, stats))
            }
            Ok(None) => None,
            Err(err) => {
                warn!(source = self.judge.source_id(), error = %err, "judge enrichment degraded");
                degraded = true;
                None
            }
        };

        Ok(EnrichedRecord {
            student,
            profile,
            judge,
            degraded,
        })
    }

    async fn profile_rows(
        &self,
        record: &StudentRecord,
    ) -> anyhow::Result<Option<(ProfileAccount, Vec<PinnedRepository>)>> {
        let url = record.profile_url.trim();
        if url.is_empty() {
            debug!("no profile link");
            return Ok(None);
        }
        let handle = handle_from_url(url)?;
        let summary = self.profile.enrich(&handle).await?;

        let account = ProfileAccount {
            account_id: url.to_string(),
            student_id: record.student_id.clone(),
            handle: summary.handle.clone(),
            bio: summary.bio.clone(),
            public_repo_count: summary.public_repo_count,
        };
        let repos = summary
            .pinned
            .iter()
            .map(|pinned| PinnedRepository::new(url, pinned))
            .collect();
        Ok(Some((account, repos)))
    }

    async fn judge_rows(&self, record: &StudentRecord) -> anyhow::Result<Option<(JudgeAccount, JudgeStats)>> {
        let url = record.judge_profile_url.trim();
        if url.is_empty() {
            debug!("no judge link");
            return Ok(None);
        }
        let handle = judge_handle_from_url(url)?;
        let stats = self.judge.fetch(&handle).await?;
        let account = JudgeAccount {
            account_id: url.to_string(),
            student_id: record.student_id.clone(),
            handle,
            rank: stats.rank,
        };
        Ok(Some((account, stats)))
    }

    /// Writes the student, then its children parent-first. A failed student
    /// write is an error; failed child writes are logged and counted.
    pub async fn persist(&self, record: &EnrichedRecord) -> Result<PersistReport, IngestError> {
        let student_id = record.student.student_id.clone();
        self.db
            .insert_student(&record.student)
            .await
            .map_err(|source| match source {
                StoreError::AlreadyExists(_) => IngestError::AlreadyIngested(student_id.clone()),
                source => IngestError::StudentWrite {
                    student_id: student_id.clone(),
                    source,
                },
            })?;

        let mut report = PersistReport {
            student_id,
            degraded: record.degraded,
            ..Default::default()
        };

        if let Some((account, repos)) = &record.profile {
            match self.db.insert_profile_account(account).await {
                Ok(()) => {
                    report.profile_written = true;
                    for repo in repos {
                        match self.db.upsert_pinned_repository(repo).await {
                            Ok(()) => report.pinned_written += 1,
                            Err(err) => {
                                warn!(repo_id = %repo.repo_id, error = %err, "pinned repository write failed");
                                report.child_failures += 1;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(account_id = %account.account_id, error = %err, "profile account write failed; skipping its repositories");
                    report.child_failures += 1;
                }
            }
        }

        if let Some((account, stats)) = &record.judge {
            match self.db.insert_judge_account(account).await {
                Ok(()) => {
                    report.judge_written = true;
                    match self.db.insert_problem_counts(&account.account_id, stats).await {
                        Ok(problem_id) => report.problem_id = Some(problem_id),
                        Err(err) => {
                            warn!(account_id = %account.account_id, error = %err, "problem counts write failed");
                            report.child_failures += 1;
                        }
                    }
                }
                Err(err) => {
                    warn!(account_id = %account.account_id, error = %err, "judge account write failed");
                    report.child_failures += 1;
                }
            }
        }

        debug!(
            student_id = %report.student_id,
            pinned = report.pinned_written,
            child_failures = report.child_failures,
            "record persisted"
        );
        Ok(report)
    }

    /// Writes one mentor session. Returns `false` when the session was skipped
    /// because its mentor is unknown or its student is not stored.
    pub async fn persist_session(&self, session: &MentorSessionRecord) -> Result<bool, IngestError> {
        let mentor_id = match self.db.resolve_mentor(&session.mentor_name).await {
            Ok(id) => id,
            Err(StoreError::NotFound(_) | StoreError::InvalidInput(_)) => {
                warn!(
                    student_id = %session.student_id,
                    mentor = %session.mentor_name,
                    "skipping session: mentor unresolved"
                );
                return Ok(false);
            }
            Err(other) => return Err(IngestError::Store(other)),
        };

        if !self.db.student_exists(&session.student_id).await? {
            warn!(student_id = %session.student_id, "skipping session: student not stored");
            return Ok(false);
        }

        let row = MentorSession {
            mentor_id,
            student_id: session.student_id.clone(),
            date: session.date.clone(),
            advice: session.advice.clone(),
        };
        match self.db.insert_mentor_session(&row).await {
            Ok(()) => Ok(true),
            Err(StoreError::AlreadyExists(_)) => {
                debug!(
                    student_id = %session.student_id,
                    date = %session.date,
                    "skipping session: already stored"
                );
                Ok(false)
            }
            Err(source) => Err(IngestError::SessionWrite {
                student_id: session.student_id.clone(),
                date: session.date.clone(),
                source,
            }),
        }
    }

    /// Enriches a record whose student is not stored yet. A stored student is
    /// reported as [`IngestError::AlreadyIngested`] before any fetch happens.
    pub async fn enrich_new(&self, record: &StudentRecord) -> Result<EnrichedRecord, IngestError> {
        if self.db.student_exists(&record.student_id).await? {
            return Err(IngestError::AlreadyIngested(record.student_id.clone()));
        }
        self.enrich(record).await
    }

    /// Enrich and persist a single ad-hoc record.
    pub async fn ingest_one(&self, record: &StudentRecord) -> Result<PersistReport, IngestError> {
        let span = info_span!("ingest_one", student_id = %record.student_id);
        async move {
            let enriched = self.enrich_new(record).await?;
            let report = self.persist(&enriched).await?;
            info!(degraded = report.degraded, "record ingested");
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_ingestor, student_record};

    #[tokio::test]
    async fn resume_references_resolve_under_the_resume_dir() {
        let db = Database::in_memory().await.unwrap();
        let ingestor = fake_ingestor(db, "/srv/resumes");
        assert_eq!(ingestor.resume_path("a.pdf"), "/srv/resumes/a.pdf");
        assert_eq!(ingestor.resume_path("/abs/b.pdf"), "/abs/b.pdf");
        assert_eq!(ingestor.resume_path("  "), "");
    }

    #[tokio::test]
    async fn ingest_one_writes_every_child_row() {
        let db = Database::in_memory().await.unwrap();
        db.insert_mentor("Smith").await.unwrap();
        let ingestor = fake_ingestor(db.clone(), "resumes");

        let report = ingestor
            .ingest_one(&student_record("A1", "Smith", "alice", "u/alice"))
            .await
            .unwrap();
        assert!(report.profile_written);
        assert_eq!(report.pinned_written, 2);
        assert!(report.judge_written);
        assert!(report.problem_id.is_some());
        assert!(!report.degraded);

        let footprint = db.student_footprint("A1").await.unwrap();
        assert_eq!(footprint.students, 1);
        assert_eq!(footprint.profile_accounts, 1);
        assert_eq!(footprint.pinned_repositories, 2);
        assert_eq!(footprint.judge_accounts, 1);
        assert_eq!(footprint.problem_counts, 1);
    }

    #[tokio::test]
    async fn ingest_one_rejects_an_existing_student() {
        let db = Database::in_memory().await.unwrap();
        db.insert_mentor("Smith").await.unwrap();
        let ingestor = fake_ingestor(db, "resumes");
        let record = student_record("A1", "Smith", "alice", "alice");

        ingestor.ingest_one(&record).await.unwrap();
        let err = ingestor.ingest_one(&record).await.unwrap_err();
        assert!(matches!(err, IngestError::AlreadyIngested(id) if id == "A1"));
    }

    #[tokio::test]
    async fn unresolved_mentor_writes_nothing() {
        let db = Database::in_memory().await.unwrap();
        let ingestor = fake_ingestor(db.clone(), "resumes");

        let err = ingestor
            .ingest_one(&student_record("B1", "unknown-name", "alice", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::MentorUnresolved { source: StoreError::NotFound(_), .. }
        ));
        assert!(db.table_counts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_sources_degrade_instead_of_failing() {
        let db = Database::in_memory().await.unwrap();
        db.insert_mentor("Smith").await.unwrap();
        let ingestor = fake_ingestor(db.clone(), "resumes");

        let enriched = ingestor
            .enrich(&student_record("C1", "Smith", "ghost", "malformed"))
            .await
            .unwrap();
        assert!(enriched.degraded);
        assert!(enriched.profile.is_none());
        assert!(enriched.judge.is_none());

        let report = ingestor.persist(&enriched).await.unwrap();
        assert!(report.degraded);
        let footprint = db.student_footprint("C1").await.unwrap();
        assert_eq!(footprint.students, 1);
        assert_eq!(footprint.total(), 1);
    }

    #[tokio::test]
    async fn unknown_judge_stats_are_stored_as_zeros() {
        let db = Database::in_memory().await.unwrap();
        db.insert_mentor("Smith").await.unwrap();
        let ingestor = fake_ingestor(db.clone(), "resumes");

        let report = ingestor
            .ingest_one(&student_record("D1", "Smith", "alice", "nobody"))
            .await
            .unwrap();
        assert!(report.degraded);

        let (account, counts) = db.judge_summary("D1").await.unwrap().unwrap();
        assert_eq!(account.rank, 0);
        assert_eq!(counts.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn sessions_need_a_known_mentor_and_a_stored_student() {
        let db = Database::in_memory().await.unwrap();
        db.insert_mentor("Smith").await.unwrap();
        let ingestor = fake_ingestor(db.clone(), "resumes");
        ingestor
            .ingest_one(&student_record("A1", "Smith", "", ""))
            .await
            .unwrap();

        let session = |mentor: &str, srn: &str| MentorSessionRecord {
            mentor_name: mentor.to_string(),
            student_id: srn.to_string(),
            date: "2024-01-10".to_string(),
            advice: "Practice graphs".to_string(),
        };
        assert!(ingestor.persist_session(&session("Smith", "A1")).await.unwrap());
        assert!(!ingestor.persist_session(&session("Nobody", "A1")).await.unwrap());
        assert!(!ingestor.persist_session(&session("Smith", "ZZ")).await.unwrap());
        assert_eq!(db.table_counts().await.unwrap().mentor_sessions, 1);
    }

    #[tokio::test]
    async fn a_stored_session_is_skipped_on_the_second_write() {
        let db = Database::in_memory().await.unwrap();
        db.insert_mentor("Smith").await.unwrap();
        let ingestor = fake_ingestor(db.clone(), "resumes");
        ingestor
            .ingest_one(&student_record("A1", "Smith", "", ""))
            .await
            .unwrap();

        let session = MentorSessionRecord {
            mentor_name: "Smith".to_string(),
            student_id: "A1".to_string(),
            date: "2024-01-10".to_string(),
            advice: "Practice graphs".to_string(),
        };
        assert!(ingestor.persist_session(&session).await.unwrap());
        assert!(!ingestor.persist_session(&session).await.unwrap());
        assert_eq!(db.table_counts().await.unwrap().mentor_sessions, 1);
    }

    #[tokio::test]
    async fn enrich_new_stops_at_a_stored_student() {
        let db = Database::in_memory().await.unwrap();
        db.insert_mentor("Smith").await.unwrap();
        let ingestor = fake_ingestor(db, "resumes");
        let record = student_record("A1", "Smith", "alice", "alice");

        assert!(ingestor.enrich_new(&record).await.is_ok());
        ingestor.ingest_one(&record).await.unwrap();
        let err = ingestor.enrich_new(&record).await.unwrap_err();
        assert!(matches!(err, IngestError::AlreadyIngested(id) if id == "A1"));
    }
}
