//! User API routes
//!
//! - `POST /api/v1/users/benefits/enroll` - queue an eligibility file
//! - `POST /api/v1/users/sign-up` - create a user account

use axum::{extract::State, http::StatusCode, routing::post, Router};

use super::commands::{request_enrollment, sign_up, RequestEnrollmentCommand, SignUpCommand};
use crate::{
    error::{ApiJson, AppError},
    features::FeatureState,
};

pub fn users_routes() -> Router<FeatureState> {
    Router::new()
        .route("/benefits/enroll", post(enroll_benefits))
        .route("/sign-up", post(sign_up_user))
}

/// Queue an eligibility file for processing
///
/// # Response
///
/// - `202 Accepted` - Request queued; processing happens in the background
/// - `400 Bad Request` - Malformed body, or `file` or `employerName` missing
#[tracing::instrument(skip(state, command), fields(employer = %command.employer_name))]
async fn enroll_benefits(
    State(state): State<FeatureState>,
    ApiJson(command): ApiJson<RequestEnrollmentCommand>,
) -> Result<StatusCode, AppError> {
    request_enrollment::handle(&state.publisher, command)?;
    Ok(StatusCode::ACCEPTED)
}

/// Create a user account
///
/// # Response
///
/// - `200 OK` - User created
/// - `400 Bad Request` - Malformed body or validation error
/// - `404 Not Found` - Enrollment's employer no longer exists
/// - `409 Conflict` - Email already registered
#[tracing::instrument(skip(state, command), fields(email = %command.email))]
async fn sign_up_user(
    State(state): State<FeatureState>,
    ApiJson(command): ApiJson<SignUpCommand>,
) -> Result<StatusCode, AppError> {
    sign_up::handle(
        state.store.as_ref(),
        state.employers.as_ref(),
        state.users.as_ref(),
        command,
    )
    .await?;
    Ok(StatusCode::OK)
}
