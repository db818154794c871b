//! Domain service for face enrollment and biometric verification.
//!
//! A user owns at most one enrolled embedding; re-enrolling overwrites it.
//! Verification compares the probe embedding against the stored one by
//! Euclidean distance, and escalates to a PIN challenge when the enrollment
//! carries one.

use serde::Serialize;
use thiserror::Error;

use crate::tokens::{TokenError, TokenPair};

/// Errors specific to face enrollment and verification.
#[derive(Debug, Error)]
pub enum FaceError {
    #[error("incorrect email or password")]
    IncorrectCredentials,

    #[error("email address is not confirmed")]
    EmailNotConfirmed,

    #[error("uploaded file is empty")]
    EmptyFile,

    #[error("uploaded file exceeds the {limit} byte limit")]
    FileTooLarge { limit: usize },

    #[error("file does not look like a supported image")]
    UnreadableImage,

    #[error("embedding contains invalid values")]
    InvalidEmbedding,

    #[error("embedding dimensions do not match")]
    DimensionMismatch,

    #[error("no face is enrolled for this user")]
    NoEmbeddingForUser,

    #[error("face does not match the enrolled embedding")]
    VerificationFailed,

    #[error("no PIN is set for this enrollment")]
    PinNotFound,

    #[error("incorrect PIN")]
    InvalidPin,

    #[error("a PIN already exists for this enrollment")]
    PinAlreadyExists,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for FaceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Outcome of a face verification attempt that passed the distance check.
#[derive(Debug)]
pub enum VerifyOutcome {
    /// No PIN on the enrollment: fully authenticated.
    Tokens(TokenPair),
    /// Enrollment carries a PIN: the caller must complete the challenge.
    PinChallenge { user_id: i32, embedding_id: i32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct PinStatus {
    pub has_pin: bool,
}

/// Domain service trait for face verification.
#[async_trait::async_trait]
pub trait FaceService: Send + Sync {
    /// Enrolls (or re-enrolls) a face for the authenticated user. Overwrites
    /// any existing embedding; an attached PIN survives the overwrite.
    async fn enroll(
        &self,
        user_id: i32,
        image: Vec<u8>,
        meta: Option<String>,
    ) -> Result<i32, FaceError>;

    /// Biometric login: resolves the user by email and matches the probe
    /// image against the enrolled embedding.
    async fn verify(&self, email: &str, image: Vec<u8>) -> Result<VerifyOutcome, FaceError>;

    /// Completes a PIN challenge raised by [`FaceService::verify`].
    async fn verify_pin(&self, user_id: i32, pin: &str) -> Result<TokenPair, FaceError>;

    /// Attaches a PIN to the user's enrollment. Rejects if one already
    /// exists; delete it first to change it.
    async fn create_pin(&self, user_id: i32, pin: &str) -> Result<(), FaceError>;

    /// Removes the PIN from the user's enrollment.
    async fn delete_pin(&self, user_id: i32) -> Result<(), FaceError>;

    /// Reports whether the user's enrollment carries a PIN.
    async fn pin_status(&self, user_id: i32) -> Result<PinStatus, FaceError>;

    /// Deletes the user's enrollment (and any PIN attached to it). Returns
    /// whether an enrollment existed.
    async fn delete_embedding(&self, user_id: i32) -> Result<bool, FaceError>;

    /// Reports whether the user has an enrollment.
    async fn embedding_status(&self, user_id: i32) -> Result<bool, FaceError>;
}
