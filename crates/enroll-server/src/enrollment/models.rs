//! Enrollment data types

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A queued request to process one employer's eligibility file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    /// URL or local path of the source file
    pub file: String,
    pub employer_name: String,
}

impl EnrollmentRequest {
    pub fn new(file: impl Into<String>, employer_name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            employer_name: employer_name.into(),
        }
    }
}

/// One parsed row of an eligibility file
///
/// `line_number` and `raw_line` are fixed when the row is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentFileRecord {
    pub email: String,
    pub full_name: String,
    pub country: String,
    pub birth_date: Option<NaiveDate>,
    pub salary: Option<BigDecimal>,
    pub line_number: u64,
    pub raw_line: String,
}

/// A validated row waiting to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnrollment {
    pub email: String,
    pub full_name: String,
    pub country: String,
    pub birth_date: Option<NaiveDate>,
    pub salary: Option<BigDecimal>,
    pub employer_name: String,
}

impl NewEnrollment {
    pub fn from_record(record: &EnrollmentFileRecord, employer_name: &str) -> Self {
        Self {
            email: record.email.clone(),
            full_name: record.full_name.clone(),
            country: record.country.clone(),
            birth_date: record.birth_date,
            salary: record.salary.clone(),
            employer_name: employer_name.to_string(),
        }
    }
}

/// A saved enrollment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersistedEnrollment {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub country: String,
    pub birth_date: Option<NaiveDate>,
    pub salary: Option<BigDecimal>,
    pub employer_name: String,
}

/// Counters for one processed file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub rows_succeeded: u64,
    pub rows_invalid: u64,
    pub rows_malformed: u64,
    pub rows_failed: u64,
    pub users_updated: u64,
    pub records_purged: u64,
    pub records_committed: u64,
    pub report_path: PathBuf,
}

impl JobSummary {
    /// Report lines written, one per input row
    pub fn rows_reported(&self) -> u64 {
        self.rows_succeeded + self.rows_invalid + self.rows_malformed + self.rows_failed
    }
}
