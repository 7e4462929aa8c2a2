//! Benefits Enrollment Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error taxonomy and logging setup for the enrollment workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`EnrollError`] and the [`Result`] alias used by every
//!   pipeline stage, external client and command handler
//! - **Logging**: environment-driven `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use enroll_common::{EnrollError, Result};
//!
//! fn find_employer(name: &str, matches: usize) -> Result<()> {
//!     if matches != 1 {
//!         return Err(EnrollError::employer_not_found(name));
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{EnrollError, FieldFailure, Result};
