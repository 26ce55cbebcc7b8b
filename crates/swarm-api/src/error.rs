//! # API Error Types
//!
//! Unified error handling for the telemetry hub and HTTP layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures local to the telemetry hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Failed to encode telemetry: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Subscriber write failed: {0}")]
    Send(String),

    #[error("Subscriber write timed out after {0:?}")]
    WriteTimeout(std::time::Duration),
}

/// API-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Entity not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    pub fn drone_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Drone".to_string(),
            id: id.into(),
        }
    }

    /// Get HTTP status code for this error
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get machine-readable error code
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
        }
    }
}

impl From<swarm_domain::DomainError> for ApiError {
    fn from(err: swarm_domain::DomainError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        Self::InvalidInput(format!("invalid request body: {}", err.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(error = %self, code = self.error_code(), "Request rejected");

        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "code": self.error_code(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::drone_not_found("X").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::InvalidInput("bad".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidInput("bad".into()).error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_not_found_message_names_drone() {
        let err = ApiError::drone_not_found("DRONE-404");
        assert_eq!(err.to_string(), "Entity not found: Drone with id 'DRONE-404'");
    }
}
