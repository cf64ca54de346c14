//! Unified error handling for the CLI.

use crate::config::ConfigError;
use fieldbridge_engine::ErrorKind;
use std::{path::PathBuf, process::ExitCode};

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Engine(#[from] fieldbridge_engine::Error),

    #[error("Cannot access {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CliError {
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Engine(e) => match e.kind() {
                ErrorKind::BadInput => ExitCode::from(3),
                ErrorKind::NotFound => ExitCode::from(4),
                _ => ExitCode::FAILURE,
            },
            CliError::Json(_) => ExitCode::from(3),
            CliError::Config(_) => ExitCode::from(5),
            CliError::File { .. } | CliError::Io(_) => ExitCode::FAILURE,
        }
    }
}

/// Result type alias for commands.
pub type Result<T> = std::result::Result<T, CliError>;
