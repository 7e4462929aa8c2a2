//! Enrollment persistence
//!
//! [`EnrollmentStore`] is the seam between the pipeline and storage.
//! [`PgEnrollmentStore`] is used when a database is configured,
//! [`MemoryEnrollmentStore`] otherwise and in tests.

use async_trait::async_trait;
use enroll_common::Result;

use super::models::{NewEnrollment, PersistedEnrollment};

mod memory;
mod postgres;

pub use memory::MemoryEnrollmentStore;
pub use postgres::PgEnrollmentStore;

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Delete every enrollment of the employer, returning how many were removed
    async fn purge_employer(&self, employer_name: &str) -> Result<u64>;

    /// Save all rows in one atomic operation: either every row is stored or none
    async fn save_all(&self, enrollments: Vec<NewEnrollment>) -> Result<u64>;

    /// Enrollments of the employer, ordered by id
    async fn list_by_employer(&self, employer_name: &str) -> Result<Vec<PersistedEnrollment>>;

    /// First enrollment (lowest id) for the email, if any
    async fn find_by_email(&self, email: &str) -> Result<Option<PersistedEnrollment>>;
}
