/// Error handling for flipcard_web
///
/// This module provides:
/// - The API error type wrapping board failures and bad request input
/// - HTTP status code mappings
/// - Error response formatting
/// - Error logging by severity
use flipcard_engine::BoardError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// Standard error response format for all endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "card_controlled")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (structured data)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn into_response(self, status: StatusCode) -> Response {
        reply::with_status(reply::json(&self), status).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Error classification for logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Client errors (4xx) - expected, normal operation
    Client,
    /// Server errors (5xx) - unexpected, needs investigation
    Server,
    /// Critical errors - board integrity at risk
    Critical,
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait IntoErrorResponse {
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error code
    fn error_code(&self) -> &'static str;

    fn error_message(&self) -> String;

    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }

    fn severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Server
        } else {
            ErrorSeverity::Client
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        if let Some(details) = self.error_details() {
            ErrorResponse::with_details(self.error_code(), self.error_message(), details)
        } else {
            ErrorResponse::new(self.error_code(), self.error_message())
        }
    }

    /// Convert to HTTP response, logging according to severity
    fn into_http_response(self) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        let severity = self.severity();
        let error_response = self.to_error_response();

        match severity {
            ErrorSeverity::Client => {
                tracing::info!(error = %error_response.error, "client error: {}", error_response.message);
            }
            ErrorSeverity::Server => {
                tracing::error!(error = %error_response.error, "server error: {}", error_response.message);
            }
            ErrorSeverity::Critical => {
                tracing::error!(
                    error = %error_response.error,
                    critical = true,
                    "critical error: {}",
                    error_response.message
                );
            }
        }

        error_response.into_response(status)
    }
}

/// Everything a board request can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid player id: {0:?}")]
    InvalidPlayer(String),
    #[error("Invalid card position: {0:?}, expected ROW,COL")]
    InvalidPosition(String),
    #[error(transparent)]
    Board(#[from] BoardError),
}

impl IntoErrorResponse for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPlayer(_) | ApiError::InvalidPosition(_) => StatusCode::BAD_REQUEST,
            ApiError::Board(err) => match err {
                BoardError::Format(_) => StatusCode::BAD_REQUEST,
                BoardError::EmptySpace(_)
                | BoardError::Controlled(_)
                | BoardError::NoFirstSelection(_) => StatusCode::CONFLICT,
                BoardError::Cancelled => StatusCode::REQUEST_TIMEOUT,
                BoardError::InvariantViolation(_) | BoardError::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidPlayer(_) => "invalid_player",
            ApiError::InvalidPosition(_) => "invalid_position",
            ApiError::Board(err) => match err {
                BoardError::Format(_) => "invalid_label",
                BoardError::EmptySpace(_) => "empty_space",
                BoardError::Controlled(_) => "card_controlled",
                BoardError::NoFirstSelection(_) => "no_first_card",
                BoardError::Cancelled => "flip_cancelled",
                BoardError::InvariantViolation(_) => "board_inconsistent",
                BoardError::Io(_) => "board_io",
            },
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Board(BoardError::EmptySpace(pos))
            | ApiError::Board(BoardError::Controlled(pos)) => Some(serde_json::json!({
                "row": pos.row,
                "col": pos.col,
            })),
            _ => None,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            ApiError::Board(BoardError::InvariantViolation(_)) => ErrorSeverity::Critical,
            ApiError::Board(BoardError::Io(_)) => ErrorSeverity::Server,
            _ => ErrorSeverity::Client,
        }
    }
}
