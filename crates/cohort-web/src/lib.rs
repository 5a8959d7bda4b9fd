//! Axum query service over the cohort store.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use cohort_core::{parse_dob, StudentRecord};
use cohort_storage::{Database, LeaderboardEntry};
use cohort_sync::{PersistReport, RecordIngestor};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

pub mod response;

pub use response::ApiError;

pub const CRATE_NAME: &str = "cohort-web";

pub const LEADERBOARD_SIZE: i64 = 15;

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub port: u16,
    pub secret_path: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            secret_path: PathBuf::from("testing.txt"),
        }
    }
}

impl WebConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            port: std::env::var("COHORT_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.port),
            secret_path: std::env::var("SHARED_SECRET_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.secret_path),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub ingestor: Arc<RecordIngestor>,
    pub secret_path: PathBuf,
}

impl AppState {
    pub fn new(ingestor: Arc<RecordIngestor>, secret_path: impl Into<PathBuf>) -> Self {
        Self {
            db: ingestor.database().clone(),
            ingestor,
            secret_path: secret_path.into(),
        }
    }
}

// Query parameters

#[derive(Debug, Deserialize, Default)]
struct SrnQuery {
    srn: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct StudentQuery {
    srn: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct InsertStudentQuery {
    name: Option<String>,
    srn: Option<String>,
    sem: Option<String>,
    git_link: Option<String>,
    leet_link: Option<String>,
    men_name: Option<String>,
    linkedin_link: Option<String>,
    cgpa: Option<String>,
    age: Option<String>,
    phone_num: Option<String>,
    degree: Option<String>,
    stream: Option<String>,
    gender: Option<String>,
    email: Option<String>,
    resume: Option<String>,
    dob: Option<String>,
}

// Response models

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StudentNameResponse {
    pub srn: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RepositoryView {
    pub repo_id: String,
    pub repo_name: String,
    pub languages: Vec<String>,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct GithubResponse {
    pub github_id: String,
    pub student_id: String,
    pub username: String,
    pub bio: String,
    pub repo_count: Option<i64>,
    pub repositories: Vec<RepositoryView>,
}

#[derive(Debug, Serialize)]
pub struct LeetcodeResponse {
    pub leetcode_id: String,
    pub username: String,
    pub ranking: i64,
    pub easy_solved: i64,
    pub medium_solved: i64,
    pub hard_solved: i64,
    pub total_solved: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub date: String,
    pub advice: String,
}

#[derive(Debug, Serialize)]
pub struct MentorSessionsResponse {
    pub srn: String,
    pub sessions: Vec<SessionView>,
}

#[derive(Debug, Serialize)]
pub struct LinkedinResponse {
    pub linkedin: String,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub srn: String,
    pub gender: String,
    pub cgpa: f64,
    pub email: String,
    pub sem: i64,
    pub degree: String,
    pub stream: String,
    pub age: i64,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub relative_rank: i64,
}

#[derive(Debug, Serialize)]
pub struct InsertStudentResponse {
    pub message: &'static str,
    pub report: PersistReport,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/student", get(student_handler))
        .route("/getGithub", get(github_handler))
        .route("/getLeetcode", get(leetcode_handler))
        .route("/getResume", get(resume_handler))
        .route("/getMentorSessions", get(mentor_sessions_handler))
        .route("/getLinkedin", get(linkedin_handler))
        .route("/getInfo", get(info_handler))
        .route("/getLeetCodeStatistics", get(judge_statistics_handler))
        .route("/getCGPAStatistics", get(cgpa_statistics_handler))
        .route("/deleteStudent", get(delete_student_handler))
        .route("/insertStudent", get(insert_student_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding port {port}"))?;
    info!(port, "query service listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("missing {name} parameter")))
}

fn required_parsed<T: FromStr>(value: Option<String>, name: &str) -> Result<T, ApiError> {
    let raw = required(value, name)?;
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid {name} parameter: {raw:?}")))
}

fn student_not_found(srn: &str) -> ApiError {
    ApiError::not_found(format!("student {srn} not found"))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn student_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StudentQuery>,
) -> Result<Json<StudentNameResponse>, ApiError> {
    let srn = required(query.srn, "srn")?;
    let secret = tokio::fs::read_to_string(&state.secret_path)
        .await
        .map_err(|err| {
            error!(path = %state.secret_path.display(), error = %err, "reading shared secret");
            ApiError::internal("shared secret unavailable")
        })?;
    if secret.trim_end_matches(['\r', '\n']) != query.password.unwrap_or_default() {
        return Err(ApiError::forbidden("wrong password"));
    }
    let student = state
        .db
        .student(&srn)
        .await?
        .ok_or_else(|| student_not_found(&srn))?;
    Ok(Json(StudentNameResponse {
        srn: student.student_id,
        name: student.name,
    }))
}

async fn github_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SrnQuery>,
) -> Result<Json<GithubResponse>, ApiError> {
    let srn = required(query.srn, "srn")?;
    let (account, repos) = state
        .db
        .profile_with_repositories(&srn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no profile account for {srn}")))?;
    Ok(Json(GithubResponse {
        github_id: account.account_id,
        student_id: account.student_id,
        username: account.handle,
        bio: account.bio,
        repo_count: account.public_repo_count,
        repositories: repos
            .into_iter()
            .map(|repo| RepositoryView {
                repo_id: repo.repo_id,
                repo_name: repo.name,
                languages: repo.languages.into_iter().collect(),
                description: repo.description,
            })
            .collect(),
    }))
}

async fn leetcode_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SrnQuery>,
) -> Result<Json<LeetcodeResponse>, ApiError> {
    let srn = required(query.srn, "srn")?;
    let (account, counts) = state
        .db
        .judge_summary(&srn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no judge account for {srn}")))?;
    let (easy, medium, hard, total) = counts
        .map(|c| (c.easy, c.medium, c.hard, c.total()))
        .unwrap_or_default();
    Ok(Json(LeetcodeResponse {
        leetcode_id: account.account_id,
        username: account.handle,
        ranking: account.rank,
        easy_solved: easy,
        medium_solved: medium,
        hard_solved: hard,
        total_solved: total,
    }))
}

async fn resume_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SrnQuery>,
) -> Result<Response, ApiError> {
    let srn = required(query.srn, "srn")?;
    let student = state
        .db
        .student(&srn)
        .await?
        .ok_or_else(|| student_not_found(&srn))?;
    if student.resume_path.is_empty() {
        return Err(ApiError::not_found(format!("no resume on file for {srn}")));
    }
    let bytes = match tokio::fs::read(&student.resume_path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found(format!("resume file for {srn} is missing")));
        }
        Err(err) => {
            error!(path = %student.resume_path, error = %err, "reading resume");
            return Err(ApiError::internal("could not read resume"));
        }
    };
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "inline; filename=resume.pdf"),
        ],
        bytes,
    )
        .into_response())
}

async fn mentor_sessions_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SrnQuery>,
) -> Result<Json<MentorSessionsResponse>, ApiError> {
    let srn = required(query.srn, "srn")?;
    if !state.db.student_exists(&srn).await? {
        return Err(student_not_found(&srn));
    }
    let sessions = state
        .db
        .mentor_sessions(&srn)
        .await?
        .into_iter()
        .map(|s| SessionView {
            date: s.date,
            advice: s.advice,
        })
        .collect();
    Ok(Json(MentorSessionsResponse { srn, sessions }))
}

async fn linkedin_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SrnQuery>,
) -> Result<Json<LinkedinResponse>, ApiError> {
    let srn = required(query.srn, "srn")?;
    let student = state
        .db
        .student(&srn)
        .await?
        .ok_or_else(|| student_not_found(&srn))?;
    if student.contact_link.trim().is_empty() {
        return Err(ApiError::not_found("LinkedIn link not available"));
    }
    Ok(Json(LinkedinResponse {
        linkedin: student.contact_link,
    }))
}

async fn info_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SrnQuery>,
) -> Result<Json<InfoResponse>, ApiError> {
    let srn = required(query.srn, "srn")?;
    let s = state
        .db
        .student(&srn)
        .await?
        .ok_or_else(|| student_not_found(&srn))?;
    Ok(Json(InfoResponse {
        srn: s.student_id,
        gender: s.gender,
        cgpa: s.cgpa,
        email: s.email,
        sem: s.semester,
        degree: s.degree,
        stream: s.stream,
        age: s.age,
    }))
}

async fn judge_statistics_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SrnQuery>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let srn = required(query.srn, "srn")?;
    let relative_rank = state
        .db
        .judge_relative_rank(&srn)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no known judge rank for {srn}")))?;
    let leaderboard = state.db.judge_leaderboard(LEADERBOARD_SIZE).await?;
    Ok(Json(StatisticsResponse {
        leaderboard,
        relative_rank,
    }))
}

async fn cgpa_statistics_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SrnQuery>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let srn = required(query.srn, "srn")?;
    let relative_rank = state
        .db
        .cgpa_relative_rank(&srn)
        .await?
        .ok_or_else(|| student_not_found(&srn))?;
    let leaderboard = state.db.cgpa_leaderboard(LEADERBOARD_SIZE).await?;
    Ok(Json(StatisticsResponse {
        leaderboard,
        relative_rank,
    }))
}

async fn delete_student_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SrnQuery>,
) -> Result<&'static str, ApiError> {
    let srn = required(query.srn, "srn")?;
    let deleted = state.db.delete_student(&srn).await?;
    info!(srn, rows = deleted.total(), "student deleted");
    Ok("Student and all associated records deleted successfully")
}

async fn insert_student_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InsertStudentQuery>,
) -> Result<Json<InsertStudentResponse>, ApiError> {
    let record = record_from_query(query)?;
    let report = state.ingestor.ingest_one(&record).await?;
    Ok(Json(InsertStudentResponse {
        message: "Student and all associated records inserted successfully",
        report,
    }))
}

fn finite_cgpa(value: Option<String>) -> Result<f64, ApiError> {
    let cgpa: f64 = required_parsed(value, "cgpa")?;
    if !cgpa.is_finite() {
        return Err(ApiError::bad_request(format!("invalid cgpa parameter: {cgpa}")));
    }
    Ok(cgpa)
}

fn record_from_query(query: InsertStudentQuery) -> Result<StudentRecord, ApiError> {
    let optional = |value: Option<String>| value.map(|v| v.trim().to_string()).unwrap_or_default();
    let dob = match query.dob.filter(|v| !v.trim().is_empty()) {
        Some(raw) => parse_dob(&raw).map_err(|e| ApiError::bad_request(format!("invalid dob parameter: {e}")))?,
        None => Utc::now().date_naive(),
    };

    Ok(StudentRecord {
        student_id: required(query.srn, "srn")?,
        name: required(query.name, "name")?,
        phone: optional(query.phone_num),
        dob,
        gender: optional(query.gender),
        resume_reference: optional(query.resume),
        semester: required_parsed(query.sem, "sem")?,
        mentor_name: required(query.men_name, "men_name")?,
        cgpa: finite_cgpa(query.cgpa)?,
        degree: optional(query.degree),
        stream: optional(query.stream),
        email: optional(query.email),
        profile_url: optional(query.git_link),
        judge_profile_url: optional(query.leet_link),
        age: required_parsed(query.age, "age")?,
        contact_link: optional(query.linkedin_link),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use cohort_adapters::{JudgeError, JudgeStatsSource, ProfileError, ProfileSource};
    use cohort_core::{
        JudgeAccount, JudgeStats, MentorSession, PinnedRepository, ProfileAccount, Student,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct NoProfiles;

    #[async_trait]
    impl ProfileSource for NoProfiles {
        fn source_id(&self) -> &'static str {
            "none"
        }

        async fn enrich(&self, handle: &str) -> Result<cohort_core::ProfileSummary, ProfileError> {
            Err(ProfileError::NotAProfile(handle.to_string()))
        }
    }

    struct FixedJudge;

    #[async_trait]
    impl JudgeStatsSource for FixedJudge {
        fn source_id(&self) -> &'static str {
            "fixed"
        }

        async fn fetch(&self, _handle: &str) -> Result<JudgeStats, JudgeError> {
            Ok(JudgeStats {
                rank: 42,
                easy: 3,
                medium: 2,
                hard: 1,
            })
        }
    }

    fn student(srn: &str, mentor_id: i64, cgpa: f64, resume_path: &str, linkedin: &str) -> Student {
        Student {
            student_id: srn.to_string(),
            name: format!("Student {srn}"),
            phone: "9000000000".into(),
            dob: NaiveDate::from_ymd_opt(2003, 4, 5).unwrap(),
            gender: "F".into(),
            resume_path: resume_path.to_string(),
            semester: 5,
            mentor_id,
            cgpa,
            email: format!("{srn}@example.edu"),
            age: 21,
            contact_link: linkedin.to_string(),
            degree: "BTech".into(),
            stream: "CSE".into(),
        }
    }

    async fn seeded(dir: &Path) -> (Router, Database) {
        let db = Database::in_memory().await.unwrap();
        let mentor = db.insert_mentor("Smith").await.unwrap();

        let resume = dir.join("A_Resume.pdf");
        std::fs::write(&resume, b"%PDF-1.4 fake").unwrap();
        let secret = dir.join("testing.txt");
        std::fs::write(&secret, "hunter2\n").unwrap();

        db.insert_student(&student("A", mentor, 9.1, &resume.display().to_string(), "https://linkedin.com/in/a"))
            .await
            .unwrap();
        db.insert_student(&student("B", mentor, 7.5, "", ""))
            .await
            .unwrap();
        db.insert_student(&student("C", mentor, 8.2, &dir.join("gone.pdf").display().to_string(), ""))
            .await
            .unwrap();

        let account_id = "https://github.com/alice";
        db.insert_profile_account(&ProfileAccount {
            account_id: account_id.into(),
            student_id: "A".into(),
            handle: "alice".into(),
            bio: "systems".into(),
            public_repo_count: Some(12),
        })
        .await
        .unwrap();
        for (name, langs) in [("tiny-db", vec!["Rust"]), ("notes", vec!["C", "C, C++"])] {
            let mut repo = PinnedRepository {
                repo_id: cohort_core::pinned_repo_id(account_id, name),
                account_id: account_id.into(),
                name: name.into(),
                languages: Default::default(),
                description: String::new(),
            };
            repo.languages.extend(langs.into_iter().map(String::from));
            db.upsert_pinned_repository(&repo).await.unwrap();
        }

        for (srn, rank) in [("A", 500), ("B", 50)] {
            let account = JudgeAccount {
                account_id: format!("https://leetcode.com/{srn}"),
                student_id: srn.into(),
                handle: srn.to_lowercase(),
                rank,
            };
            db.insert_judge_account(&account).await.unwrap();
            db.insert_problem_counts(
                &account.account_id,
                &JudgeStats {
                    rank,
                    easy: 10,
                    medium: 4,
                    hard: 1,
                },
            )
            .await
            .unwrap();
        }

        db.insert_mentor_session(&MentorSession {
            mentor_id: mentor,
            student_id: "A".into(),
            date: "2024-01-10".into(),
            advice: "Practice graphs".into(),
        })
        .await
        .unwrap();

        let ingestor = Arc::new(RecordIngestor::new(
            db.clone(),
            Arc::new(NoProfiles),
            Arc::new(FixedJudge),
            dir.join("resumes"),
        ));
        (app(AppState::new(ingestor, secret)), db)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let resp = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, content_type, body)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, _, body) = get(app, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = seeded(dir.path()).await;
        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn missing_srn_is_a_bad_request_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = seeded(dir.path()).await;
        for path in [
            "/student?password=hunter2",
            "/getGithub",
            "/getLeetcode",
            "/getResume",
            "/getMentorSessions",
            "/getLinkedin",
            "/getInfo?srn=",
            "/getLeetCodeStatistics",
            "/getCGPAStatistics",
            "/deleteStudent",
        ] {
            let (status, body) = get_json(&app, path).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
            assert!(body["error"].as_str().unwrap().contains("srn"), "{path}");
        }
    }

    #[tokio::test]
    async fn student_lookup_checks_the_shared_secret() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = seeded(dir.path()).await;

        let (status, _) = get_json(&app, "/student?srn=A&password=wrong").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = get_json(&app, "/student?srn=A&password=hunter2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["srn"], "A");
        assert_eq!(body["name"], "Student A");

        let (status, _) = get_json(&app, "/student?srn=ZZ&password=hunter2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn profile_view_lists_repositories_with_language_sets() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = seeded(dir.path()).await;

        let (status, body) = get_json(&app, "/getGithub?srn=A").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["repo_count"], 12);
        let repos = body["repositories"].as_array().unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0]["repo_name"], "notes");
        assert_eq!(repos[0]["languages"], serde_json::json!(["C", "C, C++"]));

        let (status, _) = get_json(&app, "/getGithub?srn=B").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn judge_view_derives_the_total() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = seeded(dir.path()).await;

        let (status, body) = get_json(&app, "/getLeetcode?srn=B").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ranking"], 50);
        assert_eq!(body["total_solved"], 15);

        let (status, _) = get_json(&app, "/getLeetcode?srn=C").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn resume_is_served_as_pdf_or_404() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = seeded(dir.path()).await;

        let (status, content_type, body) = get(&app, "/getResume?srn=A").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/pdf"));
        assert_eq!(body, b"%PDF-1.4 fake");

        let (status, _, _) = get(&app, "/getResume?srn=B").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = get(&app, "/getResume?srn=C").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = get(&app, "/getResume?srn=ZZ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn student_detail_views() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = seeded(dir.path()).await;

        let (status, body) = get_json(&app, "/getMentorSessions?srn=A").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessions"][0]["advice"], "Practice graphs");
        let (_, body) = get_json(&app, "/getMentorSessions?srn=B").await;
        assert_eq!(body["sessions"], serde_json::json!([]));

        let (status, body) = get_json(&app, "/getLinkedin?srn=A").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["linkedin"], "https://linkedin.com/in/a");
        let (status, _) = get_json(&app, "/getLinkedin?srn=B").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get_json(&app, "/getInfo?srn=C").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cgpa"], 8.2);
        assert_eq!(body["sem"], 5);
        assert_eq!(body["stream"], "CSE");
    }

    #[tokio::test]
    async fn leaderboards_and_relative_ranks() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = seeded(dir.path()).await;

        let (status, body) = get_json(&app, "/getLeetCodeStatistics?srn=A").await;
        assert_eq!(status, StatusCode::OK);
        let srns: Vec<_> = body["leaderboard"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["srn"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(srns, ["B", "A"]);
        assert_eq!(body["relative_rank"], 2);

        let (status, _) = get_json(&app, "/getLeetCodeStatistics?srn=C").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get_json(&app, "/getCGPAStatistics?srn=B").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["leaderboard"][0]["srn"], "A");
        assert_eq!(body["relative_rank"], 3);
    }

    #[tokio::test]
    async fn delete_twice_is_200_then_404() {
        let dir = tempfile::tempdir().unwrap();
        let (app, db) = seeded(dir.path()).await;
        let before = db.table_counts().await.unwrap();

        let (status, _, body) = get(&app, "/deleteStudent?srn=A").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("deleted"));
        assert!(db.student_footprint("A").await.unwrap().is_empty());

        let after_first = db.table_counts().await.unwrap();
        assert!(after_first.total() < before.total());

        let (status, body) = get_json(&app, "/deleteStudent?srn=A").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
        assert_eq!(db.table_counts().await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn insert_student_validates_and_runs_the_record_path() {
        let dir = tempfile::tempdir().unwrap();
        let (app, db) = seeded(dir.path()).await;
        let base = "/insertStudent?name=Dev&srn=D&sem=3&age=20&men_name=Smith&leet_link=https://leetcode.com/dev";

        let (status, body) = get_json(&app, base).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("cgpa"));

        let (status, _) = get_json(&app, &format!("{base}&cgpa=high")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        for cgpa in ["NaN", "inf"] {
            let (status, body) = get_json(&app, &format!("{base}&cgpa={cgpa}")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "cgpa {cgpa}");
            assert!(body["error"].as_str().unwrap().contains("cgpa"));
        }
        assert!(!db.student_exists("D").await.unwrap());

        let unknown = base.replace("men_name=Smith", "men_name=Nobody");
        let (status, _) = get_json(&app, &format!("{unknown}&cgpa=8.0")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!db.student_exists("D").await.unwrap());

        let (status, body) = get_json(&app, &format!("{base}&cgpa=8.0")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"]["judge_written"], true);
        let footprint = db.student_footprint("D").await.unwrap();
        assert_eq!(footprint.students, 1);
        assert_eq!(footprint.judge_accounts, 1);

        let (status, _) = get_json(&app, &format!("{base}&cgpa=8.0")).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn storage_failure_is_a_500_and_the_service_keeps_answering() {
        let dir = tempfile::tempdir().unwrap();
        let (app, db) = seeded(dir.path()).await;
        db.pool().close().await;

        let (status, body) = get_json(&app, "/getInfo?srn=A").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "storage failure");

        let (status, _) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
    }
}
