//! Per-row processing report, written as `lineNumber|description`

use csv_async::{AsyncWriter, AsyncWriterBuilder};
use enroll_common::{EnrollError, Result};
use std::path::{Path, PathBuf};
use tokio::fs::File;

use super::reader::ParseError;

pub const REPORT_DELIMITER: u8 = b'|';

pub const SUCCESS_DESCRIPTION: &str = "Successfully Processed.";

/// What happened to a single input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Succeeded,
    Invalid,
    Malformed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub line_number: u64,
    pub description: String,
    pub kind: RowOutcome,
}

impl RecordOutcome {
    pub fn succeeded(line_number: u64) -> Self {
        Self {
            line_number,
            description: SUCCESS_DESCRIPTION.to_string(),
            kind: RowOutcome::Succeeded,
        }
    }

    pub fn malformed(error: ParseError) -> Self {
        Self {
            line_number: error.line_number,
            description: error.message,
            kind: RowOutcome::Malformed,
        }
    }

    /// Validation errors become `Invalid`; anything else is a row failure
    pub fn from_error(line_number: u64, error: &EnrollError) -> Self {
        let kind = match error {
            EnrollError::Validation(_) => RowOutcome::Invalid,
            _ => RowOutcome::Failed,
        };

        Self {
            line_number,
            description: error.to_string(),
            kind,
        }
    }
}

pub struct ReportWriter {
    writer: AsyncWriter<File>,
    path: PathBuf,
}

impl ReportWriter {
    /// Create (or truncate) the report at `path`
    pub async fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).await?;
        let writer = AsyncWriterBuilder::new()
            .delimiter(REPORT_DELIMITER)
            .has_headers(false)
            .create_writer(file);

        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    pub async fn write(&mut self, outcome: &RecordOutcome) -> Result<()> {
        let line_number = outcome.line_number.to_string();
        self.writer
            .write_record(&[line_number.as_str(), outcome.description.as_str()])
            .await
            .map_err(report_error)
    }

    /// Flush everything written so far and return the report location
    pub async fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush().await?;
        Ok(self.path)
    }
}

fn report_error(err: csv_async::Error) -> EnrollError {
    if err.is_io_error() {
        match err.into_kind() {
            csv_async::ErrorKind::Io(io) => EnrollError::Io(io),
            other => EnrollError::Unexpected(format!("{:?}", other)),
        }
    } else {
        EnrollError::unexpected(err)
    }
}
