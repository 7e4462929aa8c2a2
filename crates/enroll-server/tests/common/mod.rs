//! Shared fixtures for integration tests
//!
//! In-process stand-ins for the Employer and User directories, a file
//! transfer that serves files straight from disk and a store whose saves
//! fail. The fakes record every call so tests can assert on what the
//! pipeline sent and in which order.

#![allow(dead_code)]

use async_trait::async_trait;
use enroll_common::{EnrollError, Result};
use enroll_server::{
    directory::{
        CreateUserRequest, DeleteUsersRequest, DirectoryUser, Employer, EmployerDirectory,
        UpdateUserRequest, UserDirectory, UserQuery,
    },
    enrollment::{
        EnrollmentProcessor, EnrollmentStore, FileTransfer, KeyedLock, MemoryEnrollmentStore,
        NewEnrollment, PersistedEnrollment,
    },
};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

pub fn employer(id: &str, name: &str) -> Employer {
    Employer {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn user(id: &str, email: &str, employer_id: Option<&str>) -> DirectoryUser {
    DirectoryUser {
        id: id.to_string(),
        email: email.to_string(),
        country: None,
        access_type: None,
        full_name: None,
        employer_id: employer_id.map(str::to_string),
        birth_date: None,
        salary: None,
    }
}

#[derive(Default)]
pub struct FakeEmployerDirectory {
    employers: Vec<Employer>,
}

impl FakeEmployerDirectory {
    pub fn new(employers: Vec<Employer>) -> Self {
        Self { employers }
    }
}

#[async_trait]
impl EmployerDirectory for FakeEmployerDirectory {
    async fn find_employers(&self, name: &str) -> Result<Vec<Employer>> {
        Ok(self
            .employers
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect())
    }
}

/// Calls made to the user directory by enrollment jobs, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    /// `find_users` for this email
    Lookup(String),
    /// `delete_users` for this employer id
    Prune(String),
}

#[derive(Default)]
pub struct FakeUserDirectory {
    users: Mutex<Vec<DirectoryUser>>,
    failing_emails: Mutex<HashSet<String>>,
    lookup_delay: Mutex<Duration>,
    events: Mutex<Vec<DirectoryCall>>,
    created: Mutex<Vec<CreateUserRequest>>,
    updates: Mutex<Vec<UpdateUserRequest>>,
    deletes: Mutex<Vec<DeleteUsersRequest>>,
}

impl FakeUserDirectory {
    pub fn new(users: Vec<DirectoryUser>) -> Self {
        Self {
            users: Mutex::new(users),
            ..Self::default()
        }
    }

    /// Lookups for `email` fail with a transport error
    pub fn fail_lookups_for(&self, email: &str) {
        self.failing_emails.lock().unwrap().insert(email.to_string());
    }

    /// Every `find_users` call waits this long before answering
    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.lock().unwrap() = delay;
    }

    pub fn events(&self) -> Vec<DirectoryCall> {
        self.events.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<CreateUserRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<UpdateUserRequest> {
        self.updates.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<DeleteUsersRequest> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserDirectory for FakeUserDirectory {
    async fn find_users(&self, query: &UserQuery) -> Result<Vec<DirectoryUser>> {
        if let Some(email) = &query.email {
            self.events
                .lock()
                .unwrap()
                .push(DirectoryCall::Lookup(email.clone()));
        }

        let delay = *self.lookup_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(email) = &query.email {
            if self.failing_emails.lock().unwrap().contains(email) {
                return Err(EnrollError::transient("user directory unavailable"));
            }
        }

        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| query.email.as_ref().map_or(true, |e| &u.email == e))
            .filter(|u| {
                query
                    .employer_id
                    .as_ref()
                    .map_or(true, |id| u.employer_id.as_ref() == Some(id))
            })
            .cloned()
            .collect())
    }

    async fn get_user(&self, id: &str) -> Result<DirectoryUser> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| EnrollError::NotFound(format!("User '{}' was not found.", id)))
    }

    async fn create_user(&self, request: &CreateUserRequest) -> Result<bool> {
        self.created.lock().unwrap().push(request.clone());
        Ok(true)
    }

    async fn update_user(&self, request: &UpdateUserRequest) -> Result<bool> {
        self.updates.lock().unwrap().push(request.clone());
        Ok(true)
    }

    async fn delete_users(&self, request: &DeleteUsersRequest) -> Result<bool> {
        self.events
            .lock()
            .unwrap()
            .push(DirectoryCall::Prune(request.employer_id.clone()));
        self.deletes.lock().unwrap().push(request.clone());
        Ok(true)
    }
}

/// Serves local paths as-is; the report lands next to the source file
#[derive(Default)]
pub struct LocalTransfer {
    downloads: AtomicUsize,
}

impl LocalTransfer {
    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileTransfer for LocalTransfer {
    async fn download(&self, source: &str) -> Result<PathBuf> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let path = PathBuf::from(source);
        if tokio::fs::metadata(&path).await.is_err() {
            return Err(EnrollError::transient(format!("'{}' not found", source)));
        }
        Ok(path)
    }
}

/// Memory store whose `save_all` always fails
pub struct FailingSaveStore {
    inner: Arc<MemoryEnrollmentStore>,
}

impl FailingSaveStore {
    pub fn new(inner: Arc<MemoryEnrollmentStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl EnrollmentStore for FailingSaveStore {
    async fn purge_employer(&self, employer_name: &str) -> Result<u64> {
        self.inner.purge_employer(employer_name).await
    }

    async fn save_all(&self, _enrollments: Vec<NewEnrollment>) -> Result<u64> {
        Err(EnrollError::Unexpected("database unavailable".to_string()))
    }

    async fn list_by_employer(&self, employer_name: &str) -> Result<Vec<PersistedEnrollment>> {
        self.inner.list_by_employer(employer_name).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<PersistedEnrollment>> {
        self.inner.find_by_email(email).await
    }
}

/// Everything a pipeline test needs, wired together
///
/// `locks` is the registry the processor uses, so tests can hold or check
/// an employer's key.
pub struct Harness {
    pub processor: Arc<EnrollmentProcessor>,
    pub store: Arc<MemoryEnrollmentStore>,
    pub users: Arc<FakeUserDirectory>,
    pub transfer: Arc<LocalTransfer>,
    pub locks: KeyedLock,
}

impl Harness {
    pub fn new(employers: Vec<Employer>, users: Vec<DirectoryUser>) -> Self {
        let store = Arc::new(MemoryEnrollmentStore::new());
        Self::build(employers, users, store.clone(), store)
    }

    /// Processor whose final save fails; `store` still sees the purge
    pub fn with_failing_saves(employers: Vec<Employer>, users: Vec<DirectoryUser>) -> Self {
        let store = Arc::new(MemoryEnrollmentStore::new());
        let failing = Arc::new(FailingSaveStore::new(store.clone()));
        Self::build(employers, users, failing, store)
    }

    fn build(
        employers: Vec<Employer>,
        users: Vec<DirectoryUser>,
        processor_store: Arc<dyn EnrollmentStore>,
        store: Arc<MemoryEnrollmentStore>,
    ) -> Self {
        let users = Arc::new(FakeUserDirectory::new(users));
        let transfer = Arc::new(LocalTransfer::default());
        let locks = KeyedLock::new();

        let processor = Arc::new(EnrollmentProcessor::new(
            locks.clone(),
            Arc::new(FakeEmployerDirectory::new(employers)),
            users.clone(),
            transfer.clone(),
            processor_store,
        ));

        Self {
            processor,
            store,
            users,
            transfer,
            locks,
        }
    }
}

/// Write an eligibility file and return its path as a string
pub fn write_file(dir: &Path, name: &str, lines: &[&str]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n")).unwrap();
    path.to_string_lossy().into_owned()
}

/// The single processing report written into `dir`
pub fn find_report(dir: &Path) -> PathBuf {
    let mut reports: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.to_string_lossy().contains("-Processing-Report-"))
        .collect();
    assert_eq!(reports.len(), 1, "expected one report in {}", dir.display());
    reports.remove(0)
}

pub fn read_report(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
