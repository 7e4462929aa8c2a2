//! Shared utilities for feature modules

pub mod validation;

pub use validation::{collect_failures, RuleResult};
