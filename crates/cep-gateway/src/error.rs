//! Error types for cep-gateway

use std::fmt;

/// Startup and command-line errors of the gateway binary
#[derive(Debug)]
pub enum GatewayError {
    /// Core error
    Core(cep_core::Error),
    /// Bad command-line usage
    Usage(String),
    /// Other error
    Other(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core(e) => write!(f, "Core error: {}", e),
            Self::Usage(e) => write!(f, "Usage error: {} (see --help)", e),
            Self::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<cep_core::Error> for GatewayError {
    fn from(e: cep_core::Error) -> Self {
        Self::Core(e)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Core(cep_core::Error::Json(e))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;
