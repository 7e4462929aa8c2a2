//! Processing of one employer's eligibility file
//!
//! For a single [`EnrollmentRequest`] the processor:
//!
//! 1. takes the employer's lock, so two files of the same employer never
//!    interleave
//! 2. resolves the employer in the Employer Directory
//! 3. downloads the file
//! 4. purges the employer's stored enrollments
//! 5. streams the file row by row, validating each row, updating the matching
//!    directory user and writing one report line per row
//! 6. saves all accepted rows in one atomic write
//! 7. asks the User Directory to delete the employer's users that were not
//!    seen in this file
//!
//! A failure in steps 2-7 aborts the job. The purge is not rolled back.

use async_trait::async_trait;
use bigdecimal::{BigDecimal, RoundingMode};
use chrono::Utc;
use enroll_common::{EnrollError, Result};
use std::{collections::BTreeSet, path::Path, sync::Arc};
use tracing::{debug, error, info};

use super::{
    lock::KeyedLock,
    models::{EnrollmentFileRecord, EnrollmentRequest, JobSummary, NewEnrollment},
    reader::EnrollmentFileReader,
    report::{RecordOutcome, ReportWriter, RowOutcome},
    store::EnrollmentStore,
    transfer::{report_path_for, report_suffix, FileTransfer},
    validator::validate_record,
    worker::EnrollmentJob,
};
use crate::directory::{
    find_single_employer, DeleteUsersRequest, Employer, EmployerDirectory, FieldUpdate,
    UpdateUserRequest, UserDirectory, UserQuery,
};

pub struct EnrollmentProcessor {
    locks: KeyedLock,
    employers: Arc<dyn EmployerDirectory>,
    users: Arc<dyn UserDirectory>,
    transfer: Arc<dyn FileTransfer>,
    store: Arc<dyn EnrollmentStore>,
}

/// State carried across the rows of one file
#[derive(Default)]
struct JobState {
    seen_user_ids: BTreeSet<String>,
    accepted: Vec<NewEnrollment>,
    summary: JobSummary,
}

impl JobState {
    fn count(&mut self, kind: &RowOutcome) {
        match kind {
            RowOutcome::Succeeded => self.summary.rows_succeeded += 1,
            RowOutcome::Invalid => self.summary.rows_invalid += 1,
            RowOutcome::Malformed => self.summary.rows_malformed += 1,
            RowOutcome::Failed => self.summary.rows_failed += 1,
        }
    }
}

impl EnrollmentProcessor {
    pub fn new(
        locks: KeyedLock,
        employers: Arc<dyn EmployerDirectory>,
        users: Arc<dyn UserDirectory>,
        transfer: Arc<dyn FileTransfer>,
        store: Arc<dyn EnrollmentStore>,
    ) -> Self {
        Self {
            locks,
            employers,
            users,
            transfer,
            store,
        }
    }

    /// Run the job, logging instead of returning failures
    ///
    /// Returns `true` when the file was fully processed.
    pub async fn process(&self, request: &EnrollmentRequest) -> bool {
        match self.run(request).await {
            Ok(summary) => {
                info!(
                    employer = %request.employer_name,
                    rows = summary.rows_reported(),
                    succeeded = summary.rows_succeeded,
                    invalid = summary.rows_invalid,
                    malformed = summary.rows_malformed,
                    failed = summary.rows_failed,
                    users_updated = summary.users_updated,
                    purged = summary.records_purged,
                    committed = summary.records_committed,
                    report = %summary.report_path.display(),
                    "Enrollment file processed"
                );
                true
            },
            Err(e) => {
                error!(
                    employer = %request.employer_name,
                    error = %e,
                    "An error has occurred while processing employer"
                );
                false
            },
        }
    }

    /// Run the job and return what it did
    #[tracing::instrument(skip(self, request), fields(employer = %request.employer_name, file = %request.file))]
    pub async fn run(&self, request: &EnrollmentRequest) -> Result<JobSummary> {
        let _guard = self.locks.acquire(&request.employer_name).await?;

        let employer = find_single_employer(self.employers.as_ref(), &request.employer_name).await?;
        let local_file = self.transfer.download(&request.file).await?;

        let mut state = JobState::default();
        state.summary.records_purged = self.store.purge_employer(&employer.name).await?;
        debug!(purged = state.summary.records_purged, "Existing enrollments removed");

        state.summary.report_path = self.reconcile_file(&local_file, &employer, &mut state).await?;

        let accepted = std::mem::take(&mut state.accepted);
        state.summary.records_committed = self.store.save_all(accepted).await?;

        let delete = DeleteUsersRequest {
            ids: state.seen_user_ids.iter().cloned().collect(),
            employer_id: employer.id.clone(),
        };
        self.users.delete_users(&delete).await?;

        Ok(state.summary)
    }

    async fn reconcile_file(
        &self,
        local_file: &Path,
        employer: &Employer,
        state: &mut JobState,
    ) -> Result<std::path::PathBuf> {
        let report_path = report_path_for(local_file, &report_suffix(Utc::now()));
        let mut reader = EnrollmentFileReader::open(local_file).await?;
        let mut report = ReportWriter::create(&report_path).await?;

        while let Some(record) = reader.next_record().await? {
            flush_parse_errors(&mut reader, &mut report, state).await?;

            let outcome = match self.reconcile_record(&record, employer, state).await {
                Ok(()) => RecordOutcome::succeeded(record.line_number),
                Err(e) => {
                    debug!(line = record.line_number, error = %e, "Enrollment row rejected");
                    RecordOutcome::from_error(record.line_number, &e)
                },
            };

            state.count(&outcome.kind);
            report.write(&outcome).await?;
        }

        flush_parse_errors(&mut reader, &mut report, state).await?;
        report.finish().await
    }

    async fn reconcile_record(
        &self,
        record: &EnrollmentFileRecord,
        employer: &Employer,
        state: &mut JobState,
    ) -> Result<()> {
        validate_record(record)?;

        if self.update_user(record, employer, state).await? {
            state.summary.users_updated += 1;
        }

        state.accepted.push(NewEnrollment::from_record(record, &employer.name));
        Ok(())
    }

    /// Push the row's country and salary to its directory user, if it has one
    async fn update_user(
        &self,
        record: &EnrollmentFileRecord,
        employer: &Employer,
        state: &mut JobState,
    ) -> Result<bool> {
        let query = UserQuery::by_email_and_employer(&record.email, &employer.id);
        let mut users = self.users.find_users(&query).await?;

        let user = match users.len() {
            0 => return Ok(false),
            1 => users.remove(0),
            count => {
                return Err(EnrollError::Unexpected(format!(
                    "Expected a single user for '{}' but found {}",
                    record.email, count
                )))
            },
        };

        state.seen_user_ids.insert(user.id.clone());

        let update = UpdateUserRequest {
            id: user.id,
            fields: vec![
                FieldUpdate::new("country", Some(record.country.clone())),
                FieldUpdate::new("salary", record.salary.as_ref().map(format_currency)),
            ],
        };
        self.users.update_user(&update).await?;

        Ok(true)
    }
}

#[async_trait]
impl EnrollmentJob for EnrollmentProcessor {
    async fn execute(&self, request: EnrollmentRequest) -> bool {
        self.process(&request).await
    }
}

async fn flush_parse_errors<R>(
    reader: &mut EnrollmentFileReader<R>,
    report: &mut ReportWriter,
    state: &mut JobState,
) -> Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
{
    if !reader.has_errors() {
        return Ok(());
    }

    for parse_error in reader.take_errors() {
        let outcome = RecordOutcome::malformed(parse_error);
        state.count(&outcome.kind);
        report.write(&outcome).await?;
    }

    Ok(())
}

/// `$1,234.50`: two decimals rounded half up, comma thousands separators,
/// `-$` prefix for negative amounts
pub fn format_currency(amount: &BigDecimal) -> String {
    let (digits, _) = amount
        .with_scale_round(2, RoundingMode::HalfUp)
        .as_bigint_and_exponent();
    let digits = digits.to_string();

    let (negative, digits) = match digits.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, digits.as_str()),
    };
    let digits = format!("{:0>3}", digits);
    let (whole, cents) = digits.split_at(digits.len() - 2);

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn currency(value: &str) -> String {
        format_currency(&BigDecimal::from_str(value).unwrap())
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(currency("0"), "$0.00");
        assert_eq!(currency("5"), "$5.00");
        assert_eq!(currency("0.5"), "$0.50");
        assert_eq!(currency("999.99"), "$999.99");
        assert_eq!(currency("1234.5"), "$1,234.50");
        assert_eq!(currency("52000"), "$52,000.00");
        assert_eq!(currency("1234567.891"), "$1,234,567.89");
    }

    #[test]
    fn test_format_currency_rounds_half_up() {
        assert_eq!(currency("10.005"), "$10.01");
        assert_eq!(currency("10.004"), "$10.00");
    }

    #[test]
    fn test_format_currency_negative() {
        assert_eq!(currency("-1234.5"), "-$1,234.50");
        assert_eq!(currency("-0.25"), "-$0.25");
    }
}
