//! Core domain model for the cohort board: roster input records, stored rows,
//! and the enrichment results handed from adapters into the sync pipeline.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use url::Url;

pub const CRATE_NAME: &str = "cohort-core";

/// One roster row, as decoded from the student CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "srn", alias = "student_id")]
    pub student_id: String,
    pub name: String,
    #[serde(rename = "ph_no", alias = "phone")]
    pub phone: String,
    #[serde(deserialize_with = "deserialize_dob")]
    pub dob: NaiveDate,
    pub gender: String,
    #[serde(rename = "resume", alias = "resume_reference")]
    pub resume_reference: String,
    #[serde(rename = "sem", alias = "semester")]
    pub semester: i64,
    pub mentor_name: String,
    #[serde(deserialize_with = "deserialize_cgpa")]
    pub cgpa: f64,
    pub degree: String,
    pub stream: String,
    pub email: String,
    #[serde(rename = "github_profile", alias = "profile_url")]
    pub profile_url: String,
    #[serde(rename = "leetcode_profile", alias = "judge_profile_url")]
    pub judge_profile_url: String,
    pub age: i64,
    #[serde(rename = "linkedin_link", alias = "contact_link")]
    pub contact_link: String,
}

/// One row of the mentoring-session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorSessionRecord {
    pub mentor_name: String,
    #[serde(rename = "srn", alias = "student_id")]
    pub student_id: String,
    pub date: String,
    #[serde(rename = "advice", alias = "advice_text")]
    pub advice: String,
}

fn deserialize_dob<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_dob(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_cgpa<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(format!("cgpa must be a finite number, got {value}")))
    }
}

/// Accepts plain `YYYY-MM-DD` dates as well as RFC 3339 timestamps.
pub fn parse_dob(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.date_naive())
        .map_err(|_| format!("invalid date of birth {raw:?}"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub phone: String,
    pub dob: NaiveDate,
    pub gender: String,
    pub resume_path: String,
    pub semester: i64,
    pub mentor_id: i64,
    pub cgpa: f64,
    pub email: String,
    pub age: i64,
    pub contact_link: String,
    pub degree: String,
    pub stream: String,
}

impl Student {
    /// Builds the stored row once the mentor has been resolved.
    pub fn from_record(record: &StudentRecord, mentor_id: i64, resume_path: String) -> Self {
        Self {
            student_id: record.student_id.clone(),
            name: record.name.clone(),
            phone: record.phone.clone(),
            dob: record.dob,
            gender: record.gender.clone(),
            resume_path,
            semester: record.semester,
            mentor_id,
            cgpa: record.cgpa,
            email: record.email.clone(),
            age: record.age,
            contact_link: record.contact_link.clone(),
            degree: record.degree.clone(),
            stream: record.stream.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mentor {
    pub mentor_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorSession {
    pub mentor_id: i64,
    pub student_id: String,
    pub date: String,
    pub advice: String,
}

/// Scraped public profile. `account_id` is the profile URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAccount {
    pub account_id: String,
    pub student_id: String,
    pub handle: String,
    pub bio: String,
    pub public_repo_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedRepository {
    pub repo_id: String,
    pub account_id: String,
    pub name: String,
    pub languages: BTreeSet<String>,
    pub description: String,
}

impl PinnedRepository {
    pub fn new(account_id: &str, summary: &PinnedRepoSummary) -> Self {
        Self {
            repo_id: pinned_repo_id(account_id, &summary.name),
            account_id: account_id.to_string(),
            name: summary.name.clone(),
            languages: summary.languages.clone(),
            description: summary.description.clone(),
        }
    }
}

/// Repository ids are derived, so two pinned entries with the same name under
/// one account map to the same id and the later write replaces the earlier.
pub fn pinned_repo_id(account_id: &str, name: &str) -> String {
    format!("{account_id}/{name}")
}

/// Coding-judge account. `account_id` is the judge profile URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeAccount {
    pub account_id: String,
    pub student_id: String,
    pub handle: String,
    pub rank: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeProblemCounts {
    pub problem_id: i64,
    pub easy: i64,
    pub medium: i64,
    pub hard: i64,
}

impl JudgeProblemCounts {
    pub fn total(&self) -> i64 {
        self.easy + self.medium + self.hard
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PinnedRepoSummary {
    pub name: String,
    pub description: String,
    pub languages: BTreeSet<String>,
}

/// Output of the profile enricher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProfileSummary {
    pub handle: String,
    pub bio: String,
    pub public_repo_count: Option<i64>,
    pub pinned: Vec<PinnedRepoSummary>,
}

/// Judge statistics. The all-zero value means "unknown" (retries exhausted),
/// not "nothing solved".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JudgeStats {
    pub rank: i64,
    pub easy: i64,
    pub medium: i64,
    pub hard: i64,
}

impl JudgeStats {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }

    pub fn total(&self) -> i64 {
        self.easy + self.medium + self.hard
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    #[error("invalid profile url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("profile url {0:?} has no handle segment")]
    MissingHandle(String),
}

fn path_segments(raw: &str) -> Result<Vec<String>, HandleError> {
    let trimmed = raw.trim();
    let absolute = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&absolute).map_err(|e| HandleError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    Ok(url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default())
}

/// `https://github.com/octocat` -> `octocat`.
pub fn handle_from_url(raw: &str) -> Result<String, HandleError> {
    path_segments(raw)?
        .into_iter()
        .next()
        .ok_or_else(|| HandleError::MissingHandle(raw.to_string()))
}

/// Like [`handle_from_url`] but understands the `/u/<handle>` form judge sites use.
pub fn judge_handle_from_url(raw: &str) -> Result<String, HandleError> {
    let segments = path_segments(raw)?;
    let handle = match segments.as_slice() {
        [prefix, handle, ..] if prefix == "u" => Some(handle.clone()),
        [first, ..] => Some(first.clone()),
        [] => None,
    };
    handle.ok_or_else(|| HandleError::MissingHandle(raw.to_string()))
}
