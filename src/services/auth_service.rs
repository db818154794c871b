//! Domain service for password authentication and account lifecycle.
//!
//! Covers registration, login, token refresh, email confirmation, and the
//! two-step password reset. All state transitions are stateless on the
//! server side: success mints signed tokens, nothing is stored per session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tokens::{TokenError, TokenPair};

/// Errors specific to account and login operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("incorrect email or password")]
    IncorrectCredentials,

    #[error("email address is not confirmed")]
    EmailNotConfirmed,

    #[error("login is already taken")]
    LoginTaken,

    #[error("email is already registered")]
    EmailTaken,

    #[error("user does not exist")]
    UserNotFound,

    #[error("user account is disabled")]
    UserInactive,

    #[error("email delivery is disabled")]
    EmailDisabled,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub email: String,
    pub password: String,
}

/// User info DTO for responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: i32,
    pub login: String,
    pub email: String,
    pub email_confirmed: bool,
}

/// Domain service trait for password authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account. Conflicts are reported deterministically: login
    /// is checked before email.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::LoginTaken`] / [`AuthError::EmailTaken`] on
    /// conflict, [`AuthError::Validation`] on malformed input.
    async fn register(&self, request: RegisterRequest) -> Result<i32, AuthError>;

    /// Verifies credentials and mints an access + refresh pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::IncorrectCredentials`] for an unknown email or a
    /// wrong password (indistinguishable by design).
    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError>;

    /// Exchanges a refresh token for a new access token. The refresh token
    /// itself is not rotated.
    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError>;

    /// Redeems an email-confirmation token. Idempotent: confirming an
    /// already-confirmed email succeeds.
    async fn confirm_email(&self, token: &str) -> Result<(), AuthError>;

    /// Emits a password-reset token out-of-band via the mailer.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailDisabled`] when no mailer is configured.
    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Redeems a reset token and overwrites the stored password hash.
    async fn complete_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Resolves an access token to the active user it belongs to. Runs on
    /// every protected request; nothing is cached.
    async fn current_user(&self, access_token: &str) -> Result<UserInfo, AuthError>;
}
