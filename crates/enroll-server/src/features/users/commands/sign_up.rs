//! Sign-up command
//!
//! A person whose email appears in a processed eligibility file signs up as an
//! employer user and inherits the enrollment's details. Anyone else signs up
//! as a direct-to-consumer user, provided the email is not taken.

use enroll_common::{EnrollError, Result};
use serde::{Deserialize, Serialize};

use crate::{
    directory::{
        find_single_employer, AccessType, CreateUserRequest, EmployerDirectory, UserDirectory,
        UserQuery,
    },
    enrollment::{EnrollmentStore, PersistedEnrollment},
    features::shared::validation::{
        collect_failures, validate_contains, validate_email, validate_max_length,
        validate_min_length, validate_required, MAX_COUNTRY_LENGTH, MAX_EMAIL_LENGTH,
    },
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

const PASSWORD_SYMBOLS: [char; 4] = ['!', '?', '*', '.'];

#[derive(Clone, Serialize, Deserialize)]
pub struct SignUpCommand {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub country: String,
}

impl std::fmt::Debug for SignUpCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpCommand")
            .field("email", &self.email)
            .field("password", &"***")
            .field("country", &self.country)
            .finish()
    }
}

impl SignUpCommand {
    /// Validates the command parameters
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every failing field:
    /// - Email must be present, well formed and at most 320 characters
    /// - Password must be at least 8 characters with an uppercase letter, a
    ///   lowercase letter, a digit and one of `! ? * .`
    /// - Country must be present and at most 2 characters
    pub fn validate(&self) -> Result<()> {
        let password = &self.password;

        collect_failures([
            validate_required("Email", &self.email)
                .and_then(|_| validate_email("Email", &self.email))
                .and_then(|_| validate_max_length("Email", &self.email, MAX_EMAIL_LENGTH)),
            validate_required("Password", password)
                .and_then(|_| {
                    validate_min_length(
                        "Password",
                        password,
                        MIN_PASSWORD_LENGTH,
                        "Password length must be at least 8.",
                    )
                })
                .and_then(|_| {
                    validate_contains(
                        "Password",
                        password,
                        |c| c.is_ascii_uppercase(),
                        "Password must contain at least one uppercase letter.",
                    )
                })
                .and_then(|_| {
                    validate_contains(
                        "Password",
                        password,
                        |c| c.is_ascii_lowercase(),
                        "Password must contain at least one lowercase letter.",
                    )
                })
                .and_then(|_| {
                    validate_contains(
                        "Password",
                        password,
                        |c| c.is_ascii_digit(),
                        "Password must contain at least one number.",
                    )
                })
                .and_then(|_| {
                    validate_contains(
                        "Password",
                        password,
                        |c| PASSWORD_SYMBOLS.contains(&c),
                        "Password must contain at least one (!? *.).",
                    )
                }),
            validate_required("Country", &self.country)
                .and_then(|_| validate_max_length("Country", &self.country, MAX_COUNTRY_LENGTH)),
        ])
    }
}

#[tracing::instrument(skip(store, employers, users, command), fields(email = %command.email))]
pub async fn handle(
    store: &dyn EnrollmentStore,
    employers: &dyn EmployerDirectory,
    users: &dyn UserDirectory,
    command: SignUpCommand,
) -> Result<()> {
    command.validate()?;

    let request = match store.find_by_email(&command.email).await? {
        Some(enrollment) => employer_user(employers, enrollment, command.password).await?,
        None => {
            ensure_email_available(users, &command.email).await?;
            direct_user(command)
        },
    };

    users.create_user(&request).await?;

    tracing::info!(access_type = ?request.access_type, "User signed up");
    Ok(())
}

async fn employer_user(
    employers: &dyn EmployerDirectory,
    enrollment: PersistedEnrollment,
    password: String,
) -> Result<CreateUserRequest> {
    let employer = find_single_employer(employers, &enrollment.employer_name).await?;

    Ok(CreateUserRequest {
        email: enrollment.email,
        password,
        country: enrollment.country,
        access_type: AccessType::Employer,
        full_name: Some(enrollment.full_name),
        employer_id: Some(employer.id),
        birth_date: enrollment.birth_date,
        salary: enrollment.salary,
    })
}

fn direct_user(command: SignUpCommand) -> CreateUserRequest {
    CreateUserRequest {
        email: command.email,
        password: command.password,
        country: command.country,
        access_type: AccessType::Dtc,
        full_name: None,
        employer_id: None,
        birth_date: None,
        salary: None,
    }
}

async fn ensure_email_available(users: &dyn UserDirectory, email: &str) -> Result<()> {
    let existing = users.find_users(&UserQuery::by_email(email)).await?;

    if !existing.is_empty() {
        return Err(EnrollError::email_conflict(email));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(email: &str, password: &str, country: &str) -> SignUpCommand {
        SignUpCommand {
            email: email.to_string(),
            password: password.to_string(),
            country: country.to_string(),
        }
    }

    fn password_failure(password: &str) -> String {
        let err = command("jane@acme.com", password, "US").validate().unwrap_err();
        let failures = err.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "Password");
        failures[0].message.clone()
    }

    #[test]
    fn test_valid_command() {
        assert!(command("jane@acme.com", "Passw0rd!", "US").validate().is_ok());
    }

    #[test]
    fn test_password_rules_in_order() {
        assert_eq!(password_failure("Pa0!"), "Password length must be at least 8.");
        assert_eq!(
            password_failure("password0!"),
            "Password must contain at least one uppercase letter."
        );
        assert_eq!(
            password_failure("PASSWORD0!"),
            "Password must contain at least one lowercase letter."
        );
        assert_eq!(password_failure("Password!"), "Password must contain at least one number.");
        assert_eq!(
            password_failure("Password0"),
            "Password must contain at least one (!? *.)."
        );
    }

    #[test]
    fn test_every_symbol_is_accepted() {
        for symbol in PASSWORD_SYMBOLS {
            let password = format!("Passw0rd{}", symbol);
            assert!(command("jane@acme.com", &password, "US").validate().is_ok());
        }
    }

    #[test]
    fn test_email_and_country_rules() {
        let err = command("not-an-email", "Passw0rd!", "USA").validate().unwrap_err();
        let fields: Vec<_> = err.failures().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["Email", "Country"]);
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", command("jane@acme.com", "Passw0rd!", "US"));
        assert!(!rendered.contains("Passw0rd!"));
    }
}
