//! Error handling for the servicegen compiler.
//!
//! This module defines the crate-wide `Error` type along with a convenient
//! `Result` alias. Layer-specific errors (templates, definition validation)
//! convert into it so that `?` works across the pipeline.
//!
//! # Examples
//!
//! ```
//! use servicegen::core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(Error::config("no definition file supplied"))
//! }
//!
//! assert!(might_fail().is_err());
//! ```

use thiserror::Error;

use crate::infrastructure::templates::TemplateError;

/// Result type for servicegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for servicegen operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Remote fetch error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Missing or unusable input source, bad options
    #[error("Configuration error: {0}")]
    Config(String),

    /// Structural problem in an API specification
    #[error("Specification error: {0}")]
    Spec(String),

    /// Specification family/version we cannot normalize
    #[error("Unsupported specification version: {0}")]
    UnsupportedVersion(String),

    /// Service definition or specification failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Template lookup, compile or render failure
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// A required external binary is not installed
    #[error("Required tool '{0}' is not available")]
    ToolMissing(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new specification error
    pub fn spec<S: Into<String>>(msg: S) -> Self {
        Self::Spec(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}
