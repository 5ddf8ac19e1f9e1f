// API error taxonomy
// Every failure surfaced to a caller maps to one of these variants

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the anonymization pipeline.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The uploaded bytes cannot be parsed as a well-formed table.
    #[error("{0}")]
    MalformedInput(String),

    /// A well-formed request referencing invalid state (empty column list,
    /// empty key, unknown column name).
    #[error("{0}")]
    InvalidRequest(String),

    /// The session id does not exist (expired, cleaned up, or never created).
    #[error("Invalid or expired file ID")]
    NotFound,

    /// Unexpected internal failure. Never leaves a partially mutated
    /// document visible.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedInput(_) | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::MalformedInput("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidRequest("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(ApiError::NotFound.to_string(), "Invalid or expired file ID");
    }
}
