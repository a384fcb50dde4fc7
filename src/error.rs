//! Account Error Types
//!
//! Centralized error handling for registration, login and session operations.
//! Every error renders as the standard response envelope.

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::ApiResponse;

/// Account service errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<String>,
    },

    #[error("User with same email or username already exists")]
    Conflict,

    #[error("User does not exist")]
    NotFound,

    #[error("Invalid user credentials")]
    InvalidCredentials,

    #[error("Unauthorized request")]
    Unauthorized,

    #[error("Invalid refresh token")]
    InvalidToken,

    #[error("Refresh token is expired or used")]
    SessionExpired,

    #[error("Error while uploading {0}")]
    Upload(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(String),
}

impl AccountError {
    /// Validation failure naming the offending fields
    pub fn validation(message: impl Into<String>, fields: Vec<String>) -> Self {
        AccountError::Validation {
            message: message.into(),
            fields,
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccountError::Validation { .. } => StatusCode::BAD_REQUEST,
            AccountError::Conflict => StatusCode::CONFLICT,
            AccountError::NotFound => StatusCode::NOT_FOUND,
            AccountError::InvalidCredentials
            | AccountError::Unauthorized
            | AccountError::InvalidToken
            | AccountError::SessionExpired => StatusCode::UNAUTHORIZED,
            AccountError::Upload(_)
            | AccountError::Database(_)
            | AccountError::Config(_)
            | AccountError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients
    fn public_message(&self) -> String {
        match self {
            AccountError::Database(_) | AccountError::Config(_) => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        }

        let errors = match &self {
            AccountError::Validation { fields, .. } => fields.clone(),
            _ => Vec::new(),
        };

        let body = ApiResponse::<()>::failure(status, self.public_message(), errors);
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AccountError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AccountError::Conflict;
            }
        }
        tracing::error!("Database error: {:?}", err);
        AccountError::Database(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AccountError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AccountError::Internal("Password hashing failed".to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AccountError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::error!("JWT signing error: {:?}", err);
        AccountError::Internal("Token signing failed".to_string())
    }
}

impl From<JsonRejection> for AccountError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected JSON body: {:?}", rejection);
        AccountError::validation(rejection.body_text(), Vec::new())
    }
}

impl From<MultipartRejection> for AccountError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::debug!("Rejected multipart body: {:?}", rejection);
        AccountError::validation(rejection.body_text(), Vec::new())
    }
}
