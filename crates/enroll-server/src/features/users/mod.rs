pub mod commands;
pub mod routes;

pub use commands::{RequestEnrollmentCommand, SignUpCommand};
pub use routes::users_routes;
