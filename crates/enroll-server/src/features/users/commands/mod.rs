pub mod request_enrollment;
pub mod sign_up;

pub use request_enrollment::RequestEnrollmentCommand;
pub use sign_up::SignUpCommand;
