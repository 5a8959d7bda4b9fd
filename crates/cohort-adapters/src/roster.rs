//! Header-mapped CSV decoding for the student roster and the mentor-session log.
//!
//! Decoding is all-or-nothing per file: the first malformed row ends the
//! sequence with an error and nothing after it is yielded.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use cohort_core::{MentorSessionRecord, StudentRecord};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("opening {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("reading header of {label}: {source}")]
    Header { label: String, source: csv::Error },
    #[error("{label} line {line}: {source}")]
    Row {
        label: String,
        line: u64,
        source: csv::Error,
    },
}

/// Lazy, single-pass decoder yielding one typed record per CSV row.
pub struct RecordDecoder<R: Read, T> {
    label: String,
    rows: csv::DeserializeRecordsIntoIter<R, T>,
    failed: bool,
}

impl<R: Read, T: DeserializeOwned> RecordDecoder<R, T> {
    pub fn new(label: impl Into<String>, reader: R) -> Result<Self, DecodeError> {
        let label = label.into();
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        csv_reader.headers().map_err(|source| DecodeError::Header {
            label: label.clone(),
            source,
        })?;
        Ok(Self {
            label,
            rows: csv_reader.into_deserialize(),
            failed: false,
        })
    }
}

impl<T: DeserializeOwned> RecordDecoder<File, T> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DecodeError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(path.display().to_string(), file)
    }
}

impl<R: Read, T: DeserializeOwned> Iterator for RecordDecoder<R, T> {
    type Item = Result<T, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.rows.next()? {
            Ok(record) => Some(Ok(record)),
            Err(source) => {
                self.failed = true;
                let line = source.position().map(|p| p.line()).unwrap_or(0);
                Some(Err(DecodeError::Row {
                    label: self.label.clone(),
                    line,
                    source,
                }))
            }
        }
    }
}

pub fn decode_roster_file(path: impl AsRef<Path>) -> Result<Vec<StudentRecord>, DecodeError> {
    RecordDecoder::open(path)?.collect()
}

pub fn decode_sessions_file(
    path: impl AsRef<Path>,
) -> Result<Vec<MentorSessionRecord>, DecodeError> {
    RecordDecoder::open(path)?.collect()
}
