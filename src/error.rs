//! Error handling module
//!
//! Centralized error types and HTTP response conversion. Domain error
//! kinds map onto transport status codes here and nowhere else:
//! Validation -> 400, Forbidden -> 403, NotFound -> 404, everything
//! else -> 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing X-API-Key header")]
    MissingToken,

    #[error("Invalid API key")]
    InvalidToken,

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Event log error: {0}")]
    EventLog(#[from] crate::event_log::EventLogError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 401 Unauthorized
            AppError::MissingToken => (StatusCode::UNAUTHORIZED, "missing_api_key", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_api_key", None),

            // Domain errors map per kind
            AppError::Domain(domain_err) => match domain_err {
                DomainError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "validation_failed", Some(msg.clone()))
                }
                DomainError::Forbidden(msg) => {
                    (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone()))
                }
                DomainError::NotFound(id) => {
                    (StatusCode::NOT_FOUND, "not_found", Some(id.to_string()))
                }
                DomainError::Consistency { .. } => {
                    // The aggregation engine retries these internally; one
                    // escaping this far is a bug worth loud logging.
                    tracing::error!("Consistency error escaped the aggregation engine: {}", domain_err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "aggregation_inconsistency",
                        None,
                    )
                }
            },

            // 500 Internal Server Error
            AppError::EventLog(e) => {
                tracing::error!("Event log error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "event_log_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_domain_error_status_mapping() {
        let cases = [
            (
                AppError::from(DomainError::validation("bad coords")),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(DomainError::forbidden("not yours")),
                StatusCode::FORBIDDEN,
            ),
            (
                AppError::from(DomainError::NotFound(Uuid::new_v4())),
                StatusCode::NOT_FOUND,
            ),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_auth_errors_are_401() {
        assert_eq!(
            AppError::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
