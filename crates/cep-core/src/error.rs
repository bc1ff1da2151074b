//! Error types for cep-core

use thiserror::Error;

/// Main error type for cep-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid region: {0:?}")]
    InvalidRegion(String),

    #[error("Too many regions requested: {requested} (max {max})")]
    TooManyRegions { requested: usize, max: usize },

    #[error("Browser automation failed: {0}")]
    Automation(String),

    #[error("Failed to parse page: {0}")]
    Parse(String),

    #[error("Deadline exceeded before the region finished")]
    DeadlineExceeded,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error was caused by the request itself rather than by the remote site
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRegion(_) | Self::TooManyRegions { .. })
    }
}

/// Result type alias for cep-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(Error::InvalidRegion("JI".into()).is_client_error());
        assert!(Error::TooManyRegions { requested: 6, max: 5 }.is_client_error());
        assert!(!Error::DeadlineExceeded.is_client_error());
        assert!(!Error::Automation("boom".into()).is_client_error());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::InvalidRegion("ac".into());
        assert_eq!(err.to_string(), "Invalid region: \"ac\"");

        let err = Error::TooManyRegions { requested: 6, max: 5 };
        assert!(err.to_string().contains('6'));
    }
}
