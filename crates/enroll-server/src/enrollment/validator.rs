//! Field rules for eligibility file rows

use enroll_common::Result;

use super::models::EnrollmentFileRecord;
use crate::features::shared::validation::{
    collect_failures, validate_email, validate_max_length, validate_required, MAX_COUNTRY_LENGTH,
    MAX_EMAIL_LENGTH,
};

/// Email must be present, well formed and at most 320 characters; country
/// must be present and at most 2 characters.
pub fn validate_record(record: &EnrollmentFileRecord) -> Result<()> {
    collect_failures([
        validate_required("Email", &record.email)
            .and_then(|_| validate_email("Email", &record.email))
            .and_then(|_| validate_max_length("Email", &record.email, MAX_EMAIL_LENGTH)),
        validate_required("Country", &record.country)
            .and_then(|_| validate_max_length("Country", &record.country, MAX_COUNTRY_LENGTH)),
    ])
}
