//! Error types for chiptrack operations.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Errors that can occur while servicing a request, from structural
/// validation through storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// The request data is malformed or semantically inconsistent.
    InvalidInput(String),
    /// A referenced animal, account, location, type, or visit does not exist.
    NotFound(String),
    /// The mutation would duplicate something that must be unique.
    AlreadyExists(String),
    /// A storage constraint rejected the write after pre-checks passed.
    Conflict(String),
    /// Credentials are missing or do not match any account.
    Unauthorized(String),
    /// The authenticated account is not permitted to perform the operation.
    Forbidden(String),
    /// An unclassified storage failure occurred.
    Internal(String),
}

impl AppError {
    /// Status code the error maps to at the HTTP boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Self::NotFound(msg) => write!(f, "not found: {}", msg),
            Self::AlreadyExists(msg) => write!(f, "already exists: {}", msg),
            Self::Conflict(msg) => write!(f, "conflict: {}", msg),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            Self::Forbidden(msg) => write!(f, "forbidden: {}", msg),
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("uniqueness constraint violated".to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::Conflict("foreign key constraint violated".to_string())
            }
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let msg = match &self {
            AppError::InvalidInput(msg)
            | AppError::NotFound(msg)
            | AppError::AlreadyExists(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg) => msg.clone(),
            // Storage details stay out of response bodies.
            AppError::Internal(_) => "internal server error".to_string(),
        };
        (self.status_code(), Json(serde_json::json!({ "msg": msg }))).into_response()
    }
}
