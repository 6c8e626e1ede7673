//! Client error types.

use std::fmt;

use calsync_core::PatternError;
use calsync_engine::EngineError;
use calsync_providers::ProviderError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Bad command-line input.
    Input(String),
    /// Calendar backend error.
    Provider(ProviderError),
    /// Reconciliation or mapping error.
    Engine(EngineError),
    /// Recurrence inference failed.
    Pattern(PatternError),
    /// IO error.
    Io(std::io::Error),
    /// Some changes were rejected by the destination.
    Apply { failed: usize },
    /// Applying was interrupted; applied changes were committed.
    Interrupted,
}

impl ClientError {
    /// Returns true when the user asked to stop.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Engine(e) => e.is_cancelled(),
            Self::Interrupted => true,
            _ => false,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Input(msg) => write!(f, "invalid input: {}", msg),
            Self::Provider(err) => write!(f, "calendar error: {}", err),
            Self::Engine(err) => write!(f, "{}", err),
            Self::Pattern(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Apply { failed } => write!(f, "{} change(s) could not be applied", failed),
            Self::Interrupted => write!(f, "interrupted while applying changes"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            Self::Engine(err) => Some(err),
            Self::Pattern(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl From<EngineError> for ClientError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<PatternError> for ClientError {
    fn from(err: PatternError) -> Self {
        Self::Pattern(err)
    }
}
