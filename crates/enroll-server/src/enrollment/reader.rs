//! Streaming reader for `;`-delimited eligibility files
//!
//! Rows are read one line at a time. Lines that cannot be turned into an
//! [`EnrollmentFileRecord`] do not stop the stream: they are queued as
//! [`ParseError`]s tagged with their line number and handed out through
//! [`EnrollmentFileReader::take_errors`], so the caller can report them in line
//! order next to the rows that did parse.
//!
//! Row layout, no header:
//!
//! ```text
//! Email;FullName;Country;BirthDate(MM-dd-yyyy, optional);Salary(optional)
//! ```

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use enroll_common::Result;
use std::{path::Path, str::FromStr};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader},
};

use super::models::EnrollmentFileRecord;

pub const FIELD_DELIMITER: char = ';';

const FIELD_COUNT: usize = 5;

const BIRTH_DATE_FORMAT: &str = "%m-%d-%Y";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Longest line accepted, in bytes, excluding the line ending
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// A row that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line_number: u64,
    pub message: String,
}

pub struct EnrollmentFileReader<R> {
    source: BufReader<R>,
    buffer: Vec<u8>,
    line_number: u64,
    max_line_length: usize,
    errors: Vec<ParseError>,
}

impl EnrollmentFileReader<File> {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await?;
        Ok(Self::new(file))
    }
}

impl<R: AsyncRead + Unpin> EnrollmentFileReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source: BufReader::new(source),
            buffer: Vec::new(),
            line_number: 0,
            max_line_length: MAX_LINE_LENGTH,
            errors: Vec::new(),
        }
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Next well-formed row, or `None` at end of input
    ///
    /// Empty lines are skipped. Malformed or over-long lines are queued as
    /// parse errors. Only I/O failures are returned as errors.
    pub async fn next_record(&mut self) -> Result<Option<EnrollmentFileRecord>> {
        loop {
            self.buffer.clear();
            // Room for a "\r\n" ending past the limit
            let limit = self.max_line_length as u64 + 2;
            let read = (&mut self.source)
                .take(limit)
                .read_until(b'\n', &mut self.buffer)
                .await?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            if self.buffer.len() as u64 == limit && !self.buffer.ends_with(b"\n") {
                self.skip_rest_of_line().await?;
                self.queue_error(format!("Line exceeds {} bytes", self.max_line_length));
                continue;
            }

            let mut line = trim_line_ending(&self.buffer);
            if self.line_number == 1 {
                line = line.strip_prefix(UTF8_BOM).unwrap_or(line);
            }
            if line.is_empty() {
                continue;
            }
            if line.len() > self.max_line_length {
                self.queue_error(format!("Line exceeds {} bytes", self.max_line_length));
                continue;
            }

            match parse_line(line, self.line_number) {
                Ok(record) => return Ok(Some(record)),
                Err(message) => self.queue_error(message),
            }
        }
    }

    fn queue_error(&mut self, message: String) {
        tracing::debug!(line = self.line_number, error = %message, "Malformed enrollment row");
        self.errors.push(ParseError {
            line_number: self.line_number,
            message,
        });
    }

    async fn skip_rest_of_line(&mut self) -> Result<()> {
        loop {
            let (consumed, done) = {
                let available = self.source.fill_buf().await?;
                match available.iter().position(|b| *b == b'\n') {
                    Some(end) => (end + 1, true),
                    None => (available.len(), available.is_empty()),
                }
            };
            self.source.consume(consumed);
            if done {
                return Ok(());
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Drain queued parse errors, ordered by line number
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        let mut errors = std::mem::take(&mut self.errors);
        errors.sort_by_key(|e| e.line_number);
        errors
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn parse_line(line: &[u8], line_number: u64) -> std::result::Result<EnrollmentFileRecord, String> {
    let raw_line = std::str::from_utf8(line)
        .map_err(|_| "Line is not valid UTF-8".to_string())?
        .to_string();

    let fields: Vec<&str> = raw_line.split(FIELD_DELIMITER).map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(format!(
            "Expected {} fields separated by '{}' but found {}",
            FIELD_COUNT,
            FIELD_DELIMITER,
            fields.len()
        ));
    }

    let birth_date = parse_optional(fields[3], |value| {
        NaiveDate::parse_from_str(value, BIRTH_DATE_FORMAT).map_err(|_| {
            format!("'{}' is not a valid BirthDate, expected MM-dd-yyyy", value)
        })
    })?;

    let salary = parse_optional(fields[4], |value| {
        BigDecimal::from_str(value).map_err(|_| format!("'{}' is not a valid Salary", value))
    })?;

    Ok(EnrollmentFileRecord {
        email: fields[0].to_string(),
        full_name: fields[1].to_string(),
        country: fields[2].to_string(),
        birth_date,
        salary,
        line_number,
        raw_line,
    })
}

fn parse_optional<T>(
    value: &str,
    parse: impl FnOnce(&str) -> std::result::Result<T, String>,
) -> std::result::Result<Option<T>, String> {
    if value.is_empty() {
        Ok(None)
    } else {
        parse(value).map(Some)
    }
}
