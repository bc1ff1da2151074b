//! Error types for cep-api

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// cep-api error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Persistence is disabled")]
    StoreDisabled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Core(#[from] cep_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use cep_core::Error;

        match self {
            Self::StoreDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Core(Error::InvalidRegion(_)) => StatusCode::NOT_FOUND,
            Self::Core(Error::TooManyRegions { .. }) => StatusCode::BAD_REQUEST,
            Self::Core(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        use cep_core::Error;

        match self {
            Self::StoreDisabled => "store_disabled",
            Self::Internal(_) => "internal_error",
            Self::Core(e) => match e {
                Error::InvalidRegion(_) => "invalid_region",
                Error::TooManyRegions { .. } => "too_many_regions",
                Error::Automation(_) => "automation_failed",
                Error::Parse(_) => "parse_failed",
                Error::DeadlineExceeded => "deadline_exceeded",
                Error::Database(_) => "database_error",
                Error::Json(_) | Error::Io(_) | Error::Config(_) => "internal_error",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cep_core::Error;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(Error::InvalidRegion("JI".into())), StatusCode::NOT_FOUND),
            (
                ApiError::from(Error::TooManyRegions { requested: 6, max: 5 }),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::from(Error::Automation("boom".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::from(Error::Parse("bad".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::from(Error::DeadlineExceeded), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::StoreDisabled, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err}");
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::from(Error::InvalidRegion("JI".into())).code(), "invalid_region");
        assert_eq!(ApiError::from(Error::DeadlineExceeded).code(), "deadline_exceeded");
        assert_eq!(ApiError::StoreDisabled.code(), "store_disabled");
    }

    #[test]
    fn test_core_message_passes_through() {
        let err = ApiError::from(Error::InvalidRegion("JI".into()));
        assert_eq!(err.to_string(), "Invalid region: \"JI\"");
    }
}
