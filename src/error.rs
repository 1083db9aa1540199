use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::crypto::password::PasswordError;
use crate::crypto::token::TokenError;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection could not be checked out of the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// The pool itself could not be built.
    #[error("Pool setup error: {0}")]
    PoolSetup(#[from] deadpool_postgres::CreatePoolError),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The email is already taken by another user.
    #[error("Email already registered")]
    DuplicateEmail,

    /// Unknown email or wrong password. The two are never told apart.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The request carries no usable session.
    #[error("Unauthorized")]
    Unauthorized,

    /// A session token failed verification.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// Password hashing failed or a stored hash is unreadable.
    #[error("Hashing error: {0}")]
    Hashing(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Mismatch => AppError::InvalidCredentials,
            other => AppError::Hashing(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::PoolSetup(ref e) => {
                tracing::error!("Pool setup error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::DuplicateEmail => {
                tracing::debug!("Duplicate email on registration");
                (StatusCode::CONFLICT, "email already registered".to_string())
            }

            AppError::InvalidCredentials => {
                tracing::warn!("Invalid credentials");
                (StatusCode::UNAUTHORIZED, "invalid credentials".to_string())
            }

            AppError::Unauthorized => {
                tracing::debug!("Unauthorized request");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }

            AppError::Token(TokenError::Signing(ref msg)) => {
                tracing::error!("Token signing failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Token(ref e) => {
                tracing::debug!("Token rejected: {}", e);
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "Resource not found".to_string())
            }

            AppError::Hashing(ref msg) => {
                tracing::error!("Hashing error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, [(http::header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
