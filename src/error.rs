//! Error types for holefill.
//!
//! Uses thiserror for derive macros. Every variant maps to a process exit code
//! so the CLI can tell malformed sources apart from cache or model failures.

use crate::exit_codes;
use crate::source::ParseError;
use thiserror::Error;

/// Main error type for holefill operations.
#[derive(Error, Debug)]
pub enum HolefillError {
    /// User provided invalid arguments or an unreadable input.
    #[error("{0}")]
    UserError(String),

    /// The source text contains a marker that cannot be extracted.
    #[error("Malformed source: {0}")]
    MalformedSource(String),

    /// A hole or the config file declares an invalid value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The fragment cache could not be read or written.
    #[error("Fragment cache failure: {0}")]
    CacheError(String),

    /// The generator or critic could not produce a response.
    #[error("Collaborator failure: {0}")]
    CollaboratorError(String),
}

impl HolefillError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            HolefillError::UserError(_) => exit_codes::USER_ERROR,
            HolefillError::MalformedSource(_) => exit_codes::MALFORMED_SOURCE,
            HolefillError::ConfigError(_) => exit_codes::CONFIG_ERROR,
            HolefillError::CacheError(_) => exit_codes::CACHE_FAILURE,
            HolefillError::CollaboratorError(_) => exit_codes::COLLABORATOR_FAILURE,
        }
    }
}

impl From<ParseError> for HolefillError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidRegenPolicy { .. } => HolefillError::ConfigError(err.to_string()),
            other => HolefillError::MalformedSource(other.to_string()),
        }
    }
}

/// Result type alias for holefill operations.
pub type Result<T> = std::result::Result<T, HolefillError>;
