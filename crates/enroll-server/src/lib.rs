//! Enrollment Server Library
//!
//! HTTP service that imports employer eligibility files and keeps the User
//! Directory in line with them.
//!
//! # Overview
//!
//! - **API**: `POST /api/v1/users/benefits/enroll` queues a file,
//!   `POST /api/v1/users/sign-up` creates a user account
//! - **Worker pool**: queued files are processed in the background with a
//!   bounded number of concurrent jobs and at most one job per employer
//! - **Pipeline**: each file is streamed row by row, validated, reconciled
//!   against the User Directory and written to a `|`-delimited report
//! - **Persistence**: PostgreSQL through SQLx, or an in-memory store when no
//!   database is configured
//!
//! # Example
//!
//! ```rust,ignore
//! use enroll_server::{api, config::Config};
//!
//! let config = Config::load()?;
//! let app = api::create_router(feature_state, &config.cors);
//! ```

pub mod api;
pub mod config;
pub mod directory;
pub mod enrollment;
pub mod error;
pub mod features;
pub mod middleware;

// Re-export commonly used types
pub use error::AppError;
