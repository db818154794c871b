//! Signed bearer tokens with per-purpose discrimination.
//!
//! Every token carries its [`TokenKind`] as a signed claim, so a long-lived
//! refresh token can never be replayed where an access token is expected,
//! and email-confirmation/reset tokens (whose subject is an email address,
//! not a user id) can never be used as login credentials.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TokenConfig;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token expired")]
    Expired,

    #[error("wrong token kind: expected {expected}, got {actual}")]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Discriminator embedded in the signed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    EmailConfirm,
    PasswordReset,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::EmailConfirm => "email_confirm",
            Self::PasswordReset => "password_reset",
        };
        write!(f, "{name}")
    }
}

/// Claims carried by every token. `sub` is the user id for access/refresh
/// tokens and the email address for confirm/reset tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

/// Access + refresh pair minted on successful authentication.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Stateless HS256 codec. Pure CPU, no I/O, safe to share across requests.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
    confirm_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenCodec {
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Zero leeway: expiry boundaries are exact.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_ttl: Duration::hours(i64::from(config.access_ttl_hours)),
            refresh_ttl: Duration::hours(i64::from(config.refresh_ttl_hours)),
            confirm_ttl: Duration::hours(i64::from(config.confirm_ttl_hours)),
            reset_ttl: Duration::hours(i64::from(config.reset_ttl_hours)),
        }
    }

    const fn ttl_for(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::EmailConfirm => self.confirm_ttl,
            TokenKind::PasswordReset => self.reset_ttl,
        }
    }

    /// Issues a token for `subject` with the configured TTL for `kind`.
    pub fn issue(&self, subject: &str, kind: TokenKind) -> Result<String, TokenError> {
        self.issue_with_ttl(subject, kind, self.ttl_for(kind))
    }

    /// Issues a token with an explicit TTL. A non-positive TTL produces an
    /// already-expired token.
    pub fn issue_with_ttl(
        &self,
        subject: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: subject.to_string(),
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Issues the access + refresh pair minted on successful login or face
    /// verification.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(subject, TokenKind::Access)?,
            refresh_token: self.issue(subject, TokenKind::Refresh)?,
        })
    }

    /// Decodes and validates a token, enforcing signature, expiry, and kind.
    /// Runs on every protected call; results are never cached.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, TokenError> {
        let data =
            decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Malformed,
                }
            })?;

        let claims = data.claims;
        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: claims.kind,
            });
        }

        Ok(claims)
    }
}
