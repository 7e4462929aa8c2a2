//! Clients for the external Employer and User directories
//!
//! Both directories are plain HTTP/JSON services. The traits here are the seam
//! the enrollment pipeline and the sign-up command depend on; the `Http*`
//! implementations talk to the real services and tests substitute fakes.
//!
//! Identifiers are opaque strings on both sides and JSON fields are
//! `snake_case` (`access_type`, `full_name`, `employer_id`, `birth_date`).

pub mod employers;
pub mod endpoints;
pub mod users;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use enroll_common::{EnrollError, Result};
use serde::{Deserialize, Serialize};

pub use employers::HttpEmployerDirectory;
pub use users::HttpUserDirectory;

/// Employer as returned by the Employer Directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employer {
    pub id: String,
    pub name: String,
}

/// User as returned by the User Directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub access_type: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub employer_id: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub salary: Option<BigDecimal>,
}

/// How a user gained access to the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Enrolled through an employer eligibility file
    Employer,
    /// Direct-to-consumer sign-up
    Dtc,
}

/// Filter for `GET /users`; absent fields are not sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub email: Option<String>,
    pub employer_id: Option<String>,
}

impl UserQuery {
    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            employer_id: None,
        }
    }

    pub fn by_email_and_employer(email: impl Into<String>, employer_id: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            employer_id: Some(employer_id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub country: String,
    pub access_type: AccessType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<BigDecimal>,
}

/// One `{field, value}` pair of a partial user update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub field: String,
    pub value: Option<String>,
}

impl FieldUpdate {
    pub fn new(field: impl Into<String>, value: Option<String>) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

/// Partial update of a single user; only `fields` goes on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUserRequest {
    pub id: String,
    pub fields: Vec<FieldUpdate>,
}

/// Deletes every user of `employer_id` whose id is NOT listed in `ids`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteUsersRequest {
    pub ids: Vec<String>,
    pub employer_id: String,
}

#[async_trait]
pub trait EmployerDirectory: Send + Sync {
    /// Employers whose name matches exactly
    async fn find_employers(&self, name: &str) -> Result<Vec<Employer>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_users(&self, query: &UserQuery) -> Result<Vec<DirectoryUser>>;

    async fn get_user(&self, id: &str) -> Result<DirectoryUser>;

    async fn create_user(&self, request: &CreateUserRequest) -> Result<bool>;

    async fn update_user(&self, request: &UpdateUserRequest) -> Result<bool>;

    async fn delete_users(&self, request: &DeleteUsersRequest) -> Result<bool>;
}

/// Resolve the one employer called `name`
///
/// Zero matches and ambiguous matches are both reported as not found.
pub async fn find_single_employer(
    directory: &dyn EmployerDirectory,
    name: &str,
) -> Result<Employer> {
    let mut employers = directory.find_employers(name).await?;

    match employers.len() {
        1 => Ok(employers.remove(0)),
        count => {
            tracing::warn!(employer = %name, matches = count, "Employer lookup did not resolve to a single employer");
            Err(EnrollError::employer_not_found(name))
        },
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> EnrollError {
    EnrollError::transient(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticEmployers(Vec<Employer>);

    #[async_trait]
    impl EmployerDirectory for StaticEmployers {
        async fn find_employers(&self, _name: &str) -> Result<Vec<Employer>> {
            Ok(self.0.clone())
        }
    }

    fn employer(id: &str) -> Employer {
        Employer {
            id: id.to_string(),
            name: "Acme".to_string(),
        }
    }

    #[tokio::test]
    async fn test_single_match_resolves() {
        let directory = StaticEmployers(vec![employer("emp-1")]);
        let found = find_single_employer(&directory, "Acme").await.unwrap();
        assert_eq!(found.id, "emp-1");
    }

    #[tokio::test]
    async fn test_no_match_is_not_found() {
        let directory = StaticEmployers(vec![]);
        let err = find_single_employer(&directory, "Acme").await.unwrap_err();
        assert!(matches!(err, EnrollError::NotFound(_)));
        assert_eq!(err.to_string(), "Employer 'Acme' was not found.");
    }

    #[tokio::test]
    async fn test_ambiguous_match_is_not_found() {
        let directory = StaticEmployers(vec![employer("emp-1"), employer("emp-2")]);
        let err = find_single_employer(&directory, "Acme").await.unwrap_err();
        assert!(matches!(err, EnrollError::NotFound(_)));
    }

    #[test]
    fn test_create_user_request_omits_absent_fields() {
        let request = CreateUserRequest {
            email: "jane@acme.com".to_string(),
            password: "Secr3t!pw".to_string(),
            country: "US".to_string(),
            access_type: AccessType::Dtc,
            full_name: None,
            employer_id: None,
            birth_date: None,
            salary: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["access_type"], "dtc");
        assert!(json.get("employer_id").is_none());
        assert!(json.get("salary").is_none());
    }

    #[test]
    fn test_directory_user_tolerates_missing_optional_fields() {
        let user: DirectoryUser =
            serde_json::from_str(r#"{"id":"u-1","email":"jane@acme.com"}"#).unwrap();
        assert_eq!(user.id, "u-1");
        assert!(user.employer_id.is_none());
        assert!(user.birth_date.is_none());
        assert!(user.salary.is_none());
    }

    #[test]
    fn test_directory_user_reads_birth_date_and_salary() {
        let user: DirectoryUser = serde_json::from_str(
            r#"{"id":"u-1","email":"jane@acme.com","birth_date":"1990-01-31","salary":"52000.50"}"#,
        )
        .unwrap();
        assert_eq!(user.birth_date, NaiveDate::from_ymd_opt(1990, 1, 31));
        assert_eq!(user.salary, Some("52000.50".parse::<BigDecimal>().unwrap()));
    }
}
