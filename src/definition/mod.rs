//! Service definition documents and their validation

pub mod types;
pub mod validator;

pub use types::*;
pub use validator::{IssueCode, ValidationIssue, ValidationReport, validate_definition};
