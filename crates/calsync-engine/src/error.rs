//! Engine error types.

use std::io;
use thiserror::Error;

use calsync_providers::ProviderError;

use crate::reconcile::RunPhase;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while reconciling.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The mapping file exists but could not be read.
    #[error("failed to load mapping from {path}: {source}")]
    MappingLoad {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The mapping file could not be written.
    #[error("failed to write mapping to {path}: {source}")]
    MappingFlush {
        path: String,
        #[source]
        source: io::Error,
    },

    /// An identifier cannot be stored in the mapping file.
    #[error("identifier cannot be stored in the mapping file: {id:?}")]
    InvalidIdentifier { id: String },

    /// Another run holds the mapping lock.
    #[error("another sync run holds the mapping lock ({path})")]
    AlreadyRunning { path: String },

    /// The run was cancelled; nothing was adopted.
    #[error("reconciliation cancelled after {last_completed}")]
    Cancelled { last_completed: RunPhase },

    /// A calendar backend failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// IO error (lock file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl EngineError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an error for a mapping locked by a live process.
    pub fn already_running(path: impl Into<String>) -> Self {
        Self::AlreadyRunning { path: path.into() }
    }

    /// Creates an error for an id the mapping file cannot hold.
    pub fn invalid_identifier(id: impl Into<String>) -> Self {
        Self::InvalidIdentifier { id: id.into() }
    }

    /// Returns true for cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = EngineError::Cancelled {
            last_completed: RunPhase::Windowing,
        };
        assert_eq!(err.to_string(), "reconciliation cancelled after windowing");
        assert!(err.is_cancelled());

        let err = EngineError::invalid_identifier("a:b");
        assert_eq!(
            err.to_string(),
            "identifier cannot be stored in the mapping file: \"a:b\""
        );
        assert!(!err.is_cancelled());
    }

    #[test]
    fn wraps_provider_error() {
        let err: EngineError = ProviderError::not_found("gone").into();
        assert_eq!(err.to_string(), "not_found: gone");
    }
}
