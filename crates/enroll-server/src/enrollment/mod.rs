//! Benefits enrollment processing
//!
//! Requests are accepted onto a [`queue`], picked up by the [`worker`] pool
//! and run through the [`pipeline`], which reconciles one employer's
//! eligibility file against the stored enrollments and the User Directory.

pub mod lock;
pub mod models;
pub mod pipeline;
pub mod queue;
pub mod reader;
pub mod report;
pub mod store;
pub mod transfer;
pub mod validator;
pub mod worker;

pub use lock::{KeyedLock, KeyedLockGuard};
pub use models::{EnrollmentFileRecord, EnrollmentRequest, JobSummary, NewEnrollment, PersistedEnrollment};
pub use pipeline::{format_currency, EnrollmentProcessor};
pub use queue::{EnrollmentConsumer, EnrollmentPublisher};
pub use store::{EnrollmentStore, MemoryEnrollmentStore, PgEnrollmentStore};
pub use transfer::{FileTransfer, HttpFileTransfer};
pub use worker::{EnrollmentJob, WorkerOptions, WorkerPool, WorkerPoolHandle};
