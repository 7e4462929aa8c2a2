//! Error types for the enrollment service

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for enrollment operations
pub type Result<T> = std::result::Result<T, EnrollError>;

/// A single failed field rule.
///
/// Rendered as `Field: message Severity: Error`, which is the shape written
/// into processing reports and returned in HTTP validation responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    pub field: String,
    pub message: String,
}

impl FieldFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} Severity: Error", self.field, self.message)
    }
}

fn join_failures(failures: &[FieldFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

/// Main error type for the enrollment service
#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("{0}")]
    NotFound(String),

    #[error("Validation failed: {}", join_failures(.0))]
    Validation(Vec<FieldFailure>),

    #[error("{0}")]
    Conflict(String),

    #[error("Transfer error: {0}")]
    TransientIo(String),

    #[error("Lock key cannot be empty or whitespace")]
    InvalidKey,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl EnrollError {
    pub fn employer_not_found(name: &str) -> Self {
        Self::NotFound(format!("Employer '{}' was not found.", name))
    }

    pub fn email_conflict(email: &str) -> Self {
        Self::Conflict(format!("Email '{}' already exists.", email))
    }

    pub fn transient(err: impl std::fmt::Display) -> Self {
        Self::TransientIo(err.to_string())
    }

    pub fn unexpected(err: impl std::fmt::Display) -> Self {
        Self::Unexpected(err.to_string())
    }

    /// Field failures carried by a validation error, empty otherwise
    pub fn failures(&self) -> &[FieldFailure] {
        match self {
            Self::Validation(failures) => failures,
            _ => &[],
        }
    }
}
