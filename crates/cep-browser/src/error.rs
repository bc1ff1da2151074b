//! Error types for cep-browser

use thiserror::Error;

/// cep-browser error type
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Browser initialization failed: {0}")]
    Initialization(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Interaction failed: {0}")]
    Interaction(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Tab error: {0}")]
    TabError(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BrowserError>;

impl From<BrowserError> for cep_core::Error {
    fn from(e: BrowserError) -> Self {
        cep_core::Error::Automation(e.to_string())
    }
}
