//! Request enrollment command
//!
//! Accepts an eligibility file for background processing. The handler only
//! validates and enqueues; processing happens on the worker pool.

use enroll_common::Result;
use serde::{Deserialize, Serialize};

use crate::{
    enrollment::{EnrollmentPublisher, EnrollmentRequest},
    features::shared::validation::{collect_failures, validate_required},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnrollmentCommand {
    /// URL or path of the eligibility file
    #[serde(default)]
    pub file: String,

    #[serde(default)]
    pub employer_name: String,
}

impl RequestEnrollmentCommand {
    /// Both the file and the employer name are required
    pub fn validate(&self) -> Result<()> {
        collect_failures([
            validate_required("File", &self.file),
            validate_required("EmployerName", &self.employer_name),
        ])
    }
}

impl From<RequestEnrollmentCommand> for EnrollmentRequest {
    fn from(command: RequestEnrollmentCommand) -> Self {
        EnrollmentRequest::new(command.file, command.employer_name)
    }
}

#[tracing::instrument(
    skip(publisher, command),
    fields(employer = %command.employer_name, file = %command.file)
)]
pub fn handle(publisher: &EnrollmentPublisher, command: RequestEnrollmentCommand) -> Result<()> {
    command.validate()?;

    publisher.publish(command.into())?;

    tracing::info!("Enrollment request queued");
    Ok(())
}
