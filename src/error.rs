//! Error types for the occupancy server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes returned to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotInitialized = 4,
    BadValue = 5,
    InvalidCapacity = 6,
    StorageUnavailable = 7,
    FeedUnreachable = 8,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Occupancy status has not been initialized")]
    NotInitialized,

    #[error("Invalid capacity: {0} (must be at least 1)")]
    InvalidCapacity(i32),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Sensor feed unreachable: {0}")]
    FeedUnreachable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// `query_canceled` (statement_timeout) and `lock_not_available` (lock_timeout)
const TIMEOUT_SQLSTATES: [&str; 2] = ["57014", "55P03"];

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                AppError::StorageUnavailable(e.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => AppError::StorageUnavailable(e.to_string()),
            sqlx::Error::Database(ref db)
                if db.code().is_some_and(|code| TIMEOUT_SQLSTATES.contains(&&*code)) =>
            {
                AppError::StorageUnavailable(e.to_string())
            }
            other => AppError::Database(other),
        }
    }
}

impl From<rumqttc::ClientError> for AppError {
    fn from(e: rumqttc::ClientError) -> Self {
        AppError::FeedUnreachable(e.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::NotInitialized => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::NotInitialized,
                self.to_string(),
            ),
            AppError::InvalidCapacity(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::InvalidCapacity, self.to_string())
            }
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::StorageUnavailable(msg) => {
                tracing::error!("Storage unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCode::StorageUnavailable,
                    "Storage unavailable".to_string(),
                )
            }
            AppError::FeedUnreachable(msg) => {
                (StatusCode::BAD_GATEWAY, ErrorCode::FeedUnreachable, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
