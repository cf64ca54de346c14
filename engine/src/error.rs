//! Error types for the fieldbridge engine.

use crate::{RecordId, SiteId};
use std::collections::BTreeMap;
use thiserror::Error;

/// Field-level validation messages reported by the host when a save fails.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

/// All possible errors from the engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    // Record-level errors
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("entry not found: {id} (site {site_id})")]
    NotFound { id: RecordId, site_id: SiteId },

    #[error("entry not found at path '{path}' (site {site_id})")]
    PathNotFound { path: String, site_id: SiteId },

    #[error("validation failed: {message}")]
    ValidationFailed {
        message: String,
        errors: ValidationErrors,
    },

    // Registry errors
    #[error("no handler found for field '{handle}' of type {field_type}")]
    NoHandlerFound { handle: String, field_type: String },

    #[error("invalid handler: {0}")]
    InvalidHandler(String),

    // Field-level errors, always caught by the orchestrators
    #[error("field '{handle}': {message}")]
    Field { handle: String, message: String },

    #[error("host error: {0}")]
    Host(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Machine-usable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    ValidationFailed,
    NoHandlerFound,
    InvalidHandler,
    FieldLevel,
    Host,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadInput => "bad_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::NoHandlerFound => "no_handler_found",
            ErrorKind::InvalidHandler => "invalid_handler",
            ErrorKind::FieldLevel => "field_level",
            ErrorKind::Host => "host",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Shorthand for a field-level error.
    pub fn field(handle: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Field {
            handle: handle.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadInput(_) => ErrorKind::BadInput,
            Error::NotFound { .. } | Error::PathNotFound { .. } => ErrorKind::NotFound,
            Error::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Error::NoHandlerFound { .. } => ErrorKind::NoHandlerFound,
            Error::InvalidHandler(_) => ErrorKind::InvalidHandler,
            Error::Field { .. } => ErrorKind::FieldLevel,
            Error::Host(_) | Error::InvalidSnapshot(_) => ErrorKind::Host,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
