//! PostgreSQL enrollment store

use async_trait::async_trait;
use enroll_common::{EnrollError, Result};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::EnrollmentStore;
use crate::enrollment::models::{NewEnrollment, PersistedEnrollment};

/// Rows per INSERT; 6 binds each keeps a batch well under the 65535 parameter limit
const MAX_INSERT_BATCH_SIZE: usize = 1000;

const SELECT_COLUMNS: &str =
    "SELECT id, email, full_name, country, birth_date, salary, employer_name FROM benefits_enrollments";

#[derive(Debug, Clone)]
pub struct PgEnrollmentStore {
    pool: PgPool,
}

impl PgEnrollmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentStore for PgEnrollmentStore {
    #[tracing::instrument(skip(self))]
    async fn purge_employer(&self, employer_name: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM benefits_enrollments WHERE employer_name = $1")
            .bind(employer_name)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self, enrollments), fields(count = enrollments.len()))]
    async fn save_all(&self, enrollments: Vec<NewEnrollment>) -> Result<u64> {
        if enrollments.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let mut saved = 0;

        for chunk in enrollments.chunks(MAX_INSERT_BATCH_SIZE) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO benefits_enrollments (email, full_name, country, birth_date, salary, employer_name) ",
            );

            query_builder.push_values(chunk, |mut b, enrollment| {
                b.push_bind(&enrollment.email)
                    .push_bind(&enrollment.full_name)
                    .push_bind(&enrollment.country)
                    .push_bind(enrollment.birth_date)
                    .push_bind(&enrollment.salary)
                    .push_bind(&enrollment.employer_name);
            });

            let result = query_builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
            saved += result.rows_affected();
        }

        tx.commit().await.map_err(db_error)?;
        Ok(saved)
    }

    async fn list_by_employer(&self, employer_name: &str) -> Result<Vec<PersistedEnrollment>> {
        sqlx::query_as::<_, PersistedEnrollment>(&format!(
            "{} WHERE employer_name = $1 ORDER BY id",
            SELECT_COLUMNS
        ))
        .bind(employer_name)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<PersistedEnrollment>> {
        sqlx::query_as::<_, PersistedEnrollment>(&format!(
            "{} WHERE email = $1 ORDER BY id LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }
}

fn db_error(err: sqlx::Error) -> EnrollError {
    tracing::error!(error = %err, "Enrollment store query failed");
    EnrollError::unexpected(err)
}
