//! SQLite-backed relational store: schema, ingestion writes, the mentor
//! resolver, the cascading delete transaction and the read projections used
//! by the query service.
//!
//! No cascades are declared in the schema. Callers write parents before
//! children and [`Database::delete_student`] removes children before parents.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use cohort_core::{
    JudgeAccount, JudgeProblemCounts, JudgeStats, MentorSession, PinnedRepository,
    ProfileAccount, Student,
};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS mentor (
    mentor_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    mentor_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS student (
    student_id TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    phone_no   TEXT NOT NULL,
    dob        TEXT NOT NULL,
    gender     TEXT NOT NULL,
    resume     TEXT NOT NULL,
    sem        INTEGER NOT NULL,
    mentor_id  INTEGER NOT NULL,
    cgpa       REAL NOT NULL,
    email      TEXT NOT NULL,
    age        INTEGER NOT NULL,
    linkedin   TEXT NOT NULL,
    degree     TEXT NOT NULL,
    stream     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS mentor_session (
    mentor_id  INTEGER NOT NULL,
    student_id TEXT NOT NULL,
    date       TEXT NOT NULL,
    advice     TEXT NOT NULL,
    PRIMARY KEY (mentor_id, student_id, date)
);
CREATE INDEX IF NOT EXISTS idx_mentor_session_student ON mentor_session(student_id);

CREATE TABLE IF NOT EXISTS profile_account (
    account_id        TEXT PRIMARY KEY,
    student_id        TEXT NOT NULL,
    handle            TEXT NOT NULL,
    bio               TEXT NOT NULL,
    public_repo_count INTEGER
);
CREATE INDEX IF NOT EXISTS idx_profile_account_student ON profile_account(student_id);

CREATE TABLE IF NOT EXISTS pinned_repository (
    repo_id     TEXT PRIMARY KEY,
    account_id  TEXT NOT NULL,
    name        TEXT NOT NULL,
    languages   TEXT NOT NULL DEFAULT '[]',
    description TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_pinned_repository_account ON pinned_repository(account_id);

CREATE TABLE IF NOT EXISTS judge_account (
    account_id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL,
    handle     TEXT NOT NULL,
    ranking    INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_judge_account_student ON judge_account(student_id);

CREATE TABLE IF NOT EXISTS judge_problem_counts (
    problem_id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id TEXT NOT NULL,
    easy       INTEGER NOT NULL,
    medium     INTEGER NOT NULL,
    hard       INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_judge_problem_counts_account ON judge_problem_counts(account_id);
"#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("stored language set for {repo_id} is not valid json: {source}")]
    CorruptLanguages {
        repo_id: String,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

fn map_insert_error(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists(what()),
        _ => StoreError::Database(err),
    }
}

/// Row counts for the six student-owned tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub mentor_sessions: i64,
    pub problem_counts: i64,
    pub judge_accounts: i64,
    pub pinned_repositories: i64,
    pub profile_accounts: i64,
    pub students: i64,
}

impl TableCounts {
    pub fn total(&self) -> i64 {
        self.mentor_sessions
            + self.problem_counts
            + self.judge_accounts
            + self.pinned_repositories
            + self.profile_accounts
            + self.students
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub srn: String,
    pub name: String,
    pub cgpa: f64,
    pub sem: i64,
    pub rank: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database at `url` and applies the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Single-connection in-memory database. The connection is never recycled
    /// because the data lives and dies with it.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    // Mentors

    /// Returns the id of the mentor with this name, creating the row if needed.
    pub async fn insert_mentor(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("mentor name is empty".into()));
        }
        sqlx::query("INSERT INTO mentor (mentor_name) VALUES (?1) ON CONFLICT(mentor_name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;
        self.resolve_mentor(name).await
    }

    /// Maps a mentor display name to its id. Blank names are rejected before
    /// any lookup.
    pub async fn resolve_mentor(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("mentor name is empty".into()));
        }
        let id: Option<i64> =
            sqlx::query_scalar("SELECT mentor_id FROM mentor WHERE mentor_name = ?1 LIMIT 1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        id.ok_or_else(|| StoreError::NotFound(format!("mentor {name:?}")))
    }

    // Ingestion writes

    pub async fn insert_student(&self, student: &Student) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO student
                (student_id, name, phone_no, dob, gender, resume, sem, mentor_id, cgpa, email, age, linkedin, degree, stream)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&student.student_id)
        .bind(&student.name)
        .bind(&student.phone)
        .bind(student.dob)
        .bind(&student.gender)
        .bind(&student.resume_path)
        .bind(student.semester)
        .bind(student.mentor_id)
        .bind(student.cgpa)
        .bind(&student.email)
        .bind(student.age)
        .bind(&student.contact_link)
        .bind(&student.degree)
        .bind(&student.stream)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, || format!("student {}", student.student_id)))?;
        debug!(student_id = %student.student_id, "student inserted");
        Ok(())
    }

    pub async fn student_exists(&self, student_id: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM student WHERE student_id = ?1")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn insert_profile_account(&self, account: &ProfileAccount) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profile_account (account_id, student_id, handle, bio, public_repo_count)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&account.account_id)
        .bind(&account.student_id)
        .bind(&account.handle)
        .bind(&account.bio)
        .bind(account.public_repo_count)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, || format!("profile account {}", account.account_id)))?;
        Ok(())
    }

    /// Last write wins on the derived repo id.
    pub async fn upsert_pinned_repository(&self, repo: &PinnedRepository) -> Result<()> {
        let languages = serde_json::to_string(&repo.languages).map_err(|source| {
            StoreError::CorruptLanguages {
                repo_id: repo.repo_id.clone(),
                source,
            }
        })?;
        sqlx::query(
            r#"
            INSERT INTO pinned_repository (repo_id, account_id, name, languages, description)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(repo_id) DO UPDATE SET
                account_id = excluded.account_id,
                name = excluded.name,
                languages = excluded.languages,
                description = excluded.description
            "#,
        )
        .bind(&repo.repo_id)
        .bind(&repo.account_id)
        .bind(&repo.name)
        .bind(languages)
        .bind(&repo.description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_judge_account(&self, account: &JudgeAccount) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO judge_account (account_id, student_id, handle, ranking)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&account.account_id)
        .bind(&account.student_id)
        .bind(&account.handle)
        .bind(account.rank)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, || format!("judge account {}", account.account_id)))?;
        Ok(())
    }

    /// Appends a counts row and returns its id from the persisted sequence.
    pub async fn insert_problem_counts(&self, account_id: &str, stats: &JudgeStats) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO judge_problem_counts (account_id, easy, medium, hard)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(account_id)
        .bind(stats.easy)
        .bind(stats.medium)
        .bind(stats.hard)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_mentor_session(&self, session: &MentorSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mentor_session (mentor_id, student_id, date, advice)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(session.mentor_id)
        .bind(&session.student_id)
        .bind(&session.date)
        .bind(&session.advice)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(e, || {
                format!("mentor session {}/{}/{}", session.mentor_id, session.student_id, session.date)
            })
        })?;
        Ok(())
    }

    // Cascading delete

    /// Removes a student and every dependent row in one transaction.
    /// Returns how many rows left each table.
    pub async fn delete_student(&self, student_id: &str) -> Result<TableCounts> {
        let mut tx = self.pool.begin().await?;

        let judge_ids: Vec<String> =
            sqlx::query_scalar("SELECT account_id FROM judge_account WHERE student_id = ?1")
                .bind(student_id)
                .fetch_all(&mut *tx)
                .await?;
        let profile_ids: Vec<String> =
            sqlx::query_scalar("SELECT account_id FROM profile_account WHERE student_id = ?1")
                .bind(student_id)
                .fetch_all(&mut *tx)
                .await?;
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM student WHERE student_id = ?1")
            .bind(student_id)
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            tx.rollback().await?;
            return Err(StoreError::NotFound(format!("student {student_id}")));
        }

        let mut deleted = TableCounts::default();

        deleted.mentor_sessions = sqlx::query("DELETE FROM mentor_session WHERE student_id = ?1")
            .bind(student_id)
            .execute(&mut *tx)
            .await?
            .rows_affected() as i64;

        for account_id in &judge_ids {
            deleted.problem_counts +=
                sqlx::query("DELETE FROM judge_problem_counts WHERE account_id = ?1")
                    .bind(account_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected() as i64;
        }

        deleted.judge_accounts = sqlx::query("DELETE FROM judge_account WHERE student_id = ?1")
            .bind(student_id)
            .execute(&mut *tx)
            .await?
            .rows_affected() as i64;

        for account_id in &profile_ids {
            deleted.pinned_repositories +=
                sqlx::query("DELETE FROM pinned_repository WHERE account_id = ?1")
                    .bind(account_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected() as i64;
        }

        deleted.profile_accounts = sqlx::query("DELETE FROM profile_account WHERE student_id = ?1")
            .bind(student_id)
            .execute(&mut *tx)
            .await?
            .rows_affected() as i64;

        deleted.students = sqlx::query("DELETE FROM student WHERE student_id = ?1")
            .bind(student_id)
            .execute(&mut *tx)
            .await?
            .rows_affected() as i64;

        tx.commit().await?;
        info!(student_id, rows = deleted.total(), "student deleted");
        Ok(deleted)
    }

    /// Per-table rows owned by one student.
    pub async fn student_footprint(&self, student_id: &str) -> Result<TableCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM mentor_session WHERE student_id = ?1) AS mentor_sessions,
                (SELECT COUNT(*) FROM judge_problem_counts
                  WHERE account_id IN (SELECT account_id FROM judge_account WHERE student_id = ?1)) AS problem_counts,
                (SELECT COUNT(*) FROM judge_account WHERE student_id = ?1) AS judge_accounts,
                (SELECT COUNT(*) FROM pinned_repository
                  WHERE account_id IN (SELECT account_id FROM profile_account WHERE student_id = ?1)) AS pinned_repositories,
                (SELECT COUNT(*) FROM profile_account WHERE student_id = ?1) AS profile_accounts,
                (SELECT COUNT(*) FROM student WHERE student_id = ?1) AS students
            "#,
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        table_counts_from_row(&row)
    }

    /// Row counts across whole tables.
    pub async fn table_counts(&self) -> Result<TableCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM mentor_session) AS mentor_sessions,
                (SELECT COUNT(*) FROM judge_problem_counts) AS problem_counts,
                (SELECT COUNT(*) FROM judge_account) AS judge_accounts,
                (SELECT COUNT(*) FROM pinned_repository) AS pinned_repositories,
                (SELECT COUNT(*) FROM profile_account) AS profile_accounts,
                (SELECT COUNT(*) FROM student) AS students
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        table_counts_from_row(&row)
    }

    // Read projections

    pub async fn student(&self, student_id: &str) -> Result<Option<Student>> {
        let row = sqlx::query(
            r#"
            SELECT student_id, name, phone_no, dob, gender, resume, sem, mentor_id, cgpa, email, age, linkedin, degree, stream
              FROM student
             WHERE student_id = ?1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<Student> {
            Ok(Student {
                student_id: row.try_get("student_id")?,
                name: row.try_get("name")?,
                phone: row.try_get("phone_no")?,
                dob: row.try_get("dob")?,
                gender: row.try_get("gender")?,
                resume_path: row.try_get("resume")?,
                semester: row.try_get("sem")?,
                mentor_id: row.try_get("mentor_id")?,
                cgpa: row.try_get("cgpa")?,
                email: row.try_get("email")?,
                age: row.try_get("age")?,
                contact_link: row.try_get("linkedin")?,
                degree: row.try_get("degree")?,
                stream: row.try_get("stream")?,
            })
        })
        .transpose()
    }

    pub async fn profile_with_repositories(
        &self,
        student_id: &str,
    ) -> Result<Option<(ProfileAccount, Vec<PinnedRepository>)>> {
        let row = sqlx::query(
            r#"
            SELECT account_id, student_id, handle, bio, public_repo_count
              FROM profile_account
             WHERE student_id = ?1
             ORDER BY account_id
             LIMIT 1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let account = ProfileAccount {
            account_id: row.try_get("account_id")?,
            student_id: row.try_get("student_id")?,
            handle: row.try_get("handle")?,
            bio: row.try_get("bio")?,
            public_repo_count: row.try_get("public_repo_count")?,
        };

        let rows = sqlx::query(
            r#"
            SELECT repo_id, account_id, name, languages, description
              FROM pinned_repository
             WHERE account_id = ?1
             ORDER BY name, repo_id
            "#,
        )
        .bind(&account.account_id)
        .fetch_all(&self.pool)
        .await?;

        let mut repos = Vec::with_capacity(rows.len());
        for row in rows {
            let repo_id: String = row.try_get("repo_id")?;
            let raw_languages: String = row.try_get("languages")?;
            let languages: BTreeSet<String> = serde_json::from_str(&raw_languages).map_err(
                |source| StoreError::CorruptLanguages {
                    repo_id: repo_id.clone(),
                    source,
                },
            )?;
            repos.push(PinnedRepository {
                repo_id,
                account_id: row.try_get("account_id")?,
                name: row.try_get("name")?,
                languages,
                description: row.try_get("description")?,
            });
        }
        Ok(Some((account, repos)))
    }

    /// The student's judge account plus its most recent counts row.
    pub async fn judge_summary(
        &self,
        student_id: &str,
    ) -> Result<Option<(JudgeAccount, Option<JudgeProblemCounts>)>> {
        let row = sqlx::query(
            r#"
            SELECT account_id, student_id, handle, ranking
              FROM judge_account
             WHERE student_id = ?1
             ORDER BY account_id
             LIMIT 1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let account = JudgeAccount {
            account_id: row.try_get("account_id")?,
            student_id: row.try_get("student_id")?,
            handle: row.try_get("handle")?,
            rank: row.try_get("ranking")?,
        };

        let counts = sqlx::query(
            r#"
            SELECT problem_id, easy, medium, hard
              FROM judge_problem_counts
             WHERE account_id = ?1
             ORDER BY problem_id DESC
             LIMIT 1
            "#,
        )
        .bind(&account.account_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| -> Result<JudgeProblemCounts> {
            Ok(JudgeProblemCounts {
                problem_id: row.try_get("problem_id")?,
                easy: row.try_get("easy")?,
                medium: row.try_get("medium")?,
                hard: row.try_get("hard")?,
            })
        })
        .transpose()?;

        Ok(Some((account, counts)))
    }

    pub async fn mentor_sessions(&self, student_id: &str) -> Result<Vec<MentorSession>> {
        let rows = sqlx::query(
            r#"
            SELECT mentor_id, student_id, date, advice
              FROM mentor_session
             WHERE student_id = ?1
             ORDER BY date, mentor_id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> Result<MentorSession> {
                Ok(MentorSession {
                    mentor_id: row.try_get("mentor_id")?,
                    student_id: row.try_get("student_id")?,
                    date: row.try_get("date")?,
                    advice: row.try_get("advice")?,
                })
            })
            .collect()
    }

    /// Top `limit` students by judge rank, best (lowest) first. Unknown ranks
    /// (zero) are left out.
    pub async fn judge_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT s.student_id, s.name, s.cgpa, s.sem, MIN(j.ranking) AS ranking
              FROM student s
              JOIN judge_account j ON j.student_id = s.student_id
             WHERE j.ranking > 0
             GROUP BY s.student_id, s.name, s.cgpa, s.sem
             ORDER BY ranking ASC, s.student_id ASC
             LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(leaderboard_entry_from_row).collect()
    }

    /// 1 + number of students with a strictly better known rank. `None` when
    /// the student has no known rank.
    pub async fn judge_relative_rank(&self, student_id: &str) -> Result<Option<i64>> {
        let own: Option<Option<i64>> = sqlx::query_scalar(
            "SELECT MIN(ranking) FROM judge_account WHERE student_id = ?1 AND ranking > 0",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(own) = own.flatten() else {
            return Ok(None);
        };
        let better: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM (
                SELECT student_id
                  FROM judge_account
                 WHERE ranking > 0
                 GROUP BY student_id
                HAVING MIN(ranking) < ?1
            )
            "#,
        )
        .bind(own)
        .fetch_one(&self.pool)
        .await?;
        Ok(Some(better + 1))
    }

    /// Top `limit` students by CGPA, highest first.
    pub async fn cgpa_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT s.student_id, s.name, s.cgpa, s.sem,
                   (SELECT MIN(j.ranking) FROM judge_account j
                     WHERE j.student_id = s.student_id AND j.ranking > 0) AS ranking
              FROM student s
             ORDER BY s.cgpa DESC, s.student_id ASC
             LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(leaderboard_entry_from_row).collect()
    }

    /// 1 + number of students with a strictly higher CGPA. `None` for an
    /// unknown student.
    pub async fn cgpa_relative_rank(&self, student_id: &str) -> Result<Option<i64>> {
        let own: Option<f64> = sqlx::query_scalar("SELECT cgpa FROM student WHERE student_id = ?1")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(own) = own else {
            return Ok(None);
        };
        let better: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student WHERE cgpa > ?1")
            .bind(own)
            .fetch_one(&self.pool)
            .await?;
        Ok(Some(better + 1))
    }
}

fn table_counts_from_row(row: &SqliteRow) -> Result<TableCounts> {
    Ok(TableCounts {
        mentor_sessions: row.try_get("mentor_sessions")?,
        problem_counts: row.try_get("problem_counts")?,
        judge_accounts: row.try_get("judge_accounts")?,
        pinned_repositories: row.try_get("pinned_repositories")?,
        profile_accounts: row.try_get("profile_accounts")?,
        students: row.try_get("students")?,
    })
}

fn leaderboard_entry_from_row(row: &SqliteRow) -> Result<LeaderboardEntry> {
    Ok(LeaderboardEntry {
        srn: row.try_get("student_id")?,
        name: row.try_get("name")?,
        cgpa: row.try_get("cgpa")?,
        sem: row.try_get("sem")?,
        rank: row.try_get("ranking")?,
    })
}
