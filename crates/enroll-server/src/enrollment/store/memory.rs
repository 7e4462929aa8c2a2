//! In-memory enrollment store
//!
//! Not durable: everything is lost on restart. Mutations take the write lock
//! for their whole duration, so `save_all` is atomic with respect to readers.

use async_trait::async_trait;
use enroll_common::Result;
use tokio::sync::RwLock;

use super::EnrollmentStore;
use crate::enrollment::models::{NewEnrollment, PersistedEnrollment};

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    items: Vec<PersistedEnrollment>,
}

#[derive(Debug, Default)]
pub struct MemoryEnrollmentStore {
    rows: RwLock<Rows>,
}

impl MemoryEnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EnrollmentStore for MemoryEnrollmentStore {
    async fn purge_employer(&self, employer_name: &str) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.items.len();
        rows.items.retain(|row| row.employer_name != employer_name);
        Ok((before - rows.items.len()) as u64)
    }

    async fn save_all(&self, enrollments: Vec<NewEnrollment>) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let count = enrollments.len() as u64;

        for enrollment in enrollments {
            rows.next_id += 1;
            let id = rows.next_id;
            rows.items.push(PersistedEnrollment {
                id,
                email: enrollment.email,
                full_name: enrollment.full_name,
                country: enrollment.country,
                birth_date: enrollment.birth_date,
                salary: enrollment.salary,
                employer_name: enrollment.employer_name,
            });
        }

        Ok(count)
    }

    async fn list_by_employer(&self, employer_name: &str) -> Result<Vec<PersistedEnrollment>> {
        let rows = self.rows.read().await;
        Ok(rows
            .items
            .iter()
            .filter(|row| row.employer_name == employer_name)
            .cloned()
            .collect())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<PersistedEnrollment>> {
        let rows = self.rows.read().await;
        Ok(rows.items.iter().find(|row| row.email == email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrollment(email: &str, employer: &str) -> NewEnrollment {
        NewEnrollment {
            email: email.to_string(),
            full_name: "Jane Doe".to_string(),
            country: "US".to_string(),
            birth_date: None,
            salary: None,
            employer_name: employer.to_string(),
        }
    }

    #[tokio::test]
    async fn test_purge_only_touches_one_employer() {
        let store = MemoryEnrollmentStore::new();
        store
            .save_all(vec![
                enrollment("a@acme.com", "Acme"),
                enrollment("b@acme.com", "Acme"),
                enrollment("c@globex.com", "Globex"),
            ])
            .await
            .unwrap();

        assert_eq!(store.purge_employer("Acme").await.unwrap(), 2);
        assert!(store.list_by_employer("Acme").await.unwrap().is_empty());
        assert_eq!(store.list_by_employer("Globex").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ids_keep_increasing_after_purge() {
        let store = MemoryEnrollmentStore::new();
        store.save_all(vec![enrollment("a@acme.com", "Acme")]).await.unwrap();
        store.purge_employer("Acme").await.unwrap();
        store.save_all(vec![enrollment("a@acme.com", "Acme")]).await.unwrap();

        let rows = store.list_by_employer("Acme").await.unwrap();
        assert_eq!(rows[0].id, 2);
    }

    #[tokio::test]
    async fn test_find_by_email_returns_first_match() {
        let store = MemoryEnrollmentStore::new();
        store
            .save_all(vec![
                enrollment("a@acme.com", "Acme"),
                enrollment("a@acme.com", "Globex"),
            ])
            .await
            .unwrap();

        let found = store.find_by_email("a@acme.com").await.unwrap().unwrap();
        assert_eq!(found.employer_name, "Acme");
        assert!(store.find_by_email("nobody@acme.com").await.unwrap().is_none());
    }
}
