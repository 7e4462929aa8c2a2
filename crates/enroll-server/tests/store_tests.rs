//! PostgreSQL enrollment store tests
//!
//! Run against a real database: `DATABASE_URL=... cargo test -- --ignored`.
//! `sqlx::test` creates a fresh database per test and applies the migrations.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use enroll_server::enrollment::{EnrollmentStore, NewEnrollment, PgEnrollmentStore};
use sqlx::PgPool;
use std::str::FromStr;

fn enrollment(email: &str, employer_name: &str) -> NewEnrollment {
    NewEnrollment {
        email: email.to_string(),
        full_name: "Jane Doe".to_string(),
        country: "US".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 1, 31),
        salary: Some(BigDecimal::from_str("52000.50").unwrap()),
        employer_name: employer_name.to_string(),
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_save_and_list(pool: PgPool) -> sqlx::Result<()> {
    let store = PgEnrollmentStore::new(pool);

    let saved = store
        .save_all(vec![enrollment("a@acme.com", "Acme"), enrollment("b@acme.com", "Acme")])
        .await
        .unwrap();
    assert_eq!(saved, 2);

    let rows = store.list_by_employer("Acme").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].email, "a@acme.com");
    assert_eq!(rows[0].salary, Some(BigDecimal::from_str("52000.50").unwrap()));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_purge_is_scoped_to_employer(pool: PgPool) -> sqlx::Result<()> {
    let store = PgEnrollmentStore::new(pool);
    store
        .save_all(vec![enrollment("a@acme.com", "Acme"), enrollment("c@globex.com", "Globex")])
        .await
        .unwrap();

    assert_eq!(store.purge_employer("Acme").await.unwrap(), 1);
    assert!(store.list_by_employer("Acme").await.unwrap().is_empty());
    assert!(store.find_by_email("c@globex.com").await.unwrap().is_some());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_large_batches_are_split(pool: PgPool) -> sqlx::Result<()> {
    let store = PgEnrollmentStore::new(pool);
    let rows: Vec<_> = (0..2500)
        .map(|i| enrollment(&format!("user{}@acme.com", i), "Acme"))
        .collect();

    assert_eq!(store.save_all(rows).await.unwrap(), 2500);
    assert_eq!(store.list_by_employer("Acme").await.unwrap().len(), 2500);

    Ok(())
}
