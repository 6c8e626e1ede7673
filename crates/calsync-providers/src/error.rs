//! Error types for calendar source and destination operations.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The entry or calendar does not exist.
    NotFound,
    /// An entry could not be turned into a valid calendar entry.
    InvalidData,
    /// Reading or writing the backing store failed.
    Io,
    /// The backing store holds malformed data.
    Serialization,
    /// The backend cannot express the requested entry.
    Unsupported,
}

impl ProviderErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidData => "invalid_data",
            Self::Io => "io_error",
            Self::Serialization => "serialization_error",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised by a calendar backend.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The calendar that generated this error.
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidData, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Serialization, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Unsupported, message)
    }

    /// Sets the calendar name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        let code = if err.kind() == std::io::ErrorKind::NotFound {
            ProviderErrorCode::NotFound
        } else {
            ProviderErrorCode::Io
        };
        Self::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string()).with_source(err)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_display() {
        assert_eq!(ProviderErrorCode::InvalidData.as_str(), "invalid_data");
        assert_eq!(ProviderErrorCode::Io.to_string(), "io_error");
    }

    #[test]
    fn provider_error_creation() {
        let err = ProviderError::not_found("no entry with id e1");
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
        assert_eq!(err.message(), "no entry with id e1");
        assert!(err.provider().is_none());
    }

    #[test]
    fn provider_error_display() {
        let err = ProviderError::unsupported("monthly_nth").with_provider("outlook.json");
        assert_eq!(err.to_string(), "[outlook.json] unsupported: monthly_nth");
    }

    #[test]
    fn from_io_error() {
        use std::error::Error;
        let err: ProviderError = std::io::Error::other("disk full").into();
        assert_eq!(err.code(), ProviderErrorCode::Io);
        assert!(err.source().is_some());

        let err: ProviderError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
    }

    #[test]
    fn from_json_error() {
        let err: ProviderError = serde_json::from_str::<Vec<u8>>("{").unwrap_err().into();
        assert_eq!(err.code(), ProviderErrorCode::Serialization);
    }
}
