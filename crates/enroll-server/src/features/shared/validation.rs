//! Shared validation rules
//!
//! Each rule checks one property of one field and yields a [`FieldFailure`]
//! whose message names the field the way it appears in API payloads and
//! processing reports. Rules for a field are chained with `and_then`, so only
//! the first failing rule per field is reported; [`collect_failures`] then
//! gathers every field's outcome into a single validation error.
//!
//! # Examples
//!
//! ```rust,ignore
//! use enroll_server::features::shared::validation::*;
//!
//! collect_failures([
//!     validate_required("Email", &email)
//!         .and_then(|_| validate_email("Email", &email))
//!         .and_then(|_| validate_max_length("Email", &email, MAX_EMAIL_LENGTH)),
//!     validate_required("Country", &country)
//!         .and_then(|_| validate_max_length("Country", &country, MAX_COUNTRY_LENGTH)),
//! ])?;
//! ```

use enroll_common::{EnrollError, FieldFailure};
use regex::Regex;
use std::sync::LazyLock;

/// Maximum length of an email address.
pub const MAX_EMAIL_LENGTH: usize = 320;

/// Maximum length of a country code.
pub const MAX_COUNTRY_LENGTH: usize = 2;

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").ok());

pub type RuleResult = Result<(), FieldFailure>;

/// Value must contain something other than whitespace
pub fn validate_required(field: &str, value: &str) -> RuleResult {
    if value.trim().is_empty() {
        return Err(FieldFailure::new(field, format!("'{}' must not be empty.", field)));
    }
    Ok(())
}

/// Value must be at most `max` characters
pub fn validate_max_length(field: &str, value: &str, max: usize) -> RuleResult {
    let length = value.chars().count();
    if length > max {
        return Err(FieldFailure::new(
            field,
            format!(
                "The length of '{}' must be {} characters or fewer. You entered {} characters.",
                field, max, length
            ),
        ));
    }
    Ok(())
}

/// Value must be at least `min` characters
pub fn validate_min_length(field: &str, value: &str, min: usize, message: &str) -> RuleResult {
    if value.chars().count() < min {
        return Err(FieldFailure::new(field, message));
    }
    Ok(())
}

/// Exactly one `@` with something on either side and no whitespace
pub fn validate_email(field: &str, value: &str) -> RuleResult {
    let valid = EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value));

    if !valid {
        return Err(FieldFailure::new(
            field,
            format!("'{}' is not a valid email address.", field),
        ));
    }
    Ok(())
}

/// At least one character must satisfy `predicate`
pub fn validate_contains(
    field: &str,
    value: &str,
    predicate: impl Fn(char) -> bool,
    message: &str,
) -> RuleResult {
    if !value.chars().any(predicate) {
        return Err(FieldFailure::new(field, message));
    }
    Ok(())
}

/// Fold per-field outcomes into a single validation error
pub fn collect_failures(results: impl IntoIterator<Item = RuleResult>) -> Result<(), EnrollError> {
    let failures: Vec<FieldFailure> = results.into_iter().filter_map(Result::err).collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(EnrollError::Validation(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_whitespace() {
        let failure = validate_required("File", "   ").unwrap_err();
        assert_eq!(failure.message, "'File' must not be empty.");
        assert!(validate_required("File", "x").is_ok());
    }

    #[test]
    fn test_max_length_message_reports_length() {
        let failure = validate_max_length("Country", "BRA", MAX_COUNTRY_LENGTH).unwrap_err();
        assert_eq!(
            failure.message,
            "The length of 'Country' must be 2 characters or fewer. You entered 3 characters."
        );
        assert!(validate_max_length("Country", "BR", MAX_COUNTRY_LENGTH).is_ok());
    }

    #[test]
    fn test_email_shapes() {
        for valid in ["x@x.com", "first.last+tag@sub.example.org", "a@b"] {
            assert!(validate_email("Email", valid).is_ok(), "{} should be valid", valid);
        }
        for invalid in ["", "plainaddress", "@example.com", "user@", "a@@b.com", "a b@c.com"] {
            assert!(validate_email("Email", invalid).is_err(), "{} should be invalid", invalid);
        }
    }

    #[test]
    fn test_contains_uses_predicate() {
        assert!(validate_contains("Password", "abc1", |c| c.is_ascii_digit(), "digit").is_ok());
        let failure =
            validate_contains("Password", "abc", |c| c.is_ascii_digit(), "digit").unwrap_err();
        assert_eq!(failure.message, "digit");
    }

    #[test]
    fn test_collect_keeps_field_order() {
        let err = collect_failures([
            validate_required("Email", ""),
            Ok(()),
            validate_max_length("Country", "BRA", 2),
        ])
        .unwrap_err();

        let fields: Vec<_> = err.failures().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["Email", "Country"]);
    }
}
