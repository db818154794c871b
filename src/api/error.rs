use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{AuthError, FaceError};
use crate::tokens::TokenError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),

    Unauthorized(String),

    Forbidden(String),

    NotFound(String),

    Conflict(String),

    PayloadTooLarge(String),

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {msg}"),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed | TokenError::Expired => {
                ApiError::Unauthorized(err.to_string())
            }
            TokenError::WrongKind { .. } => ApiError::Forbidden(err.to_string()),
            TokenError::Signing(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::IncorrectCredentials
            | AuthError::EmailNotConfirmed
            | AuthError::UserInactive => ApiError::Unauthorized(err.to_string()),
            AuthError::LoginTaken | AuthError::EmailTaken => ApiError::Conflict(err.to_string()),
            AuthError::UserNotFound => ApiError::NotFound(err.to_string()),
            AuthError::Validation(msg) => ApiError::BadRequest(msg),
            AuthError::Token(token_err) => token_err.into(),
            AuthError::EmailDisabled => ApiError::InternalError(err.to_string()),
            AuthError::Database(msg) => ApiError::DatabaseError(msg),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<FaceError> for ApiError {
    fn from(err: FaceError) -> Self {
        match err {
            FaceError::IncorrectCredentials
            | FaceError::EmailNotConfirmed
            | FaceError::VerificationFailed
            | FaceError::InvalidPin => ApiError::Unauthorized(err.to_string()),
            FaceError::EmptyFile | FaceError::UnreadableImage | FaceError::InvalidEmbedding => {
                ApiError::BadRequest(err.to_string())
            }
            FaceError::Validation(msg) => ApiError::BadRequest(msg),
            FaceError::FileTooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            FaceError::NoEmbeddingForUser | FaceError::PinNotFound => {
                ApiError::NotFound(err.to_string())
            }
            FaceError::PinAlreadyExists => ApiError::Conflict(err.to_string()),
            FaceError::DimensionMismatch => ApiError::InternalError(err.to_string()),
            FaceError::Token(token_err) => token_err.into(),
            FaceError::Database(msg) => ApiError::DatabaseError(msg),
            FaceError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }
}
