//! HTTP feature slices
//!
//! Each feature is a vertical slice with its own commands and routes:
//!
//! - `commands/` - write operations, each a command struct with `validate()`
//!   and a standalone `handle` function
//! - `routes.rs` - axum handlers wiring commands to HTTP
//!
//! # Features
//!
//! - **users**: benefits enrollment submission and user sign-up

pub mod shared;
pub mod users;

use axum::Router;
use std::sync::Arc;

use crate::{
    directory::{EmployerDirectory, UserDirectory},
    enrollment::{EnrollmentPublisher, EnrollmentStore},
};

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Submission queue feeding the worker pool
    pub publisher: EnrollmentPublisher,
    pub store: Arc<dyn EnrollmentStore>,
    pub employers: Arc<dyn EmployerDirectory>,
    pub users: Arc<dyn UserDirectory>,
}

/// API router with every feature mounted under its path prefix
///
/// - `/users` - enrollment submission and sign-up
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest("/users", users::users_routes().with_state(state))
}
