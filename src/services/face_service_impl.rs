use std::sync::Arc;

use tracing::{debug, info};

use crate::config::SecurityConfig;
use crate::credentials;
use crate::db::Store;
use crate::embedder::{EmbedError, FaceEmbedder};
use crate::matcher::{self, MatchError};
use crate::services::face_service::{FaceError, FaceService, PinStatus, VerifyOutcome};
use crate::tokens::{TokenCodec, TokenPair};

const MIN_PIN_LEN: usize = 4;
const MAX_PIN_LEN: usize = 32;

impl From<EmbedError> for FaceError {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::UnreadableImage => Self::UnreadableImage,
            EmbedError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<MatchError> for FaceError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidEmbedding => Self::InvalidEmbedding,
            MatchError::DimensionMismatch { .. } => Self::DimensionMismatch,
        }
    }
}

/// [`FaceService`] backed by the sqlite store and a local embedding model.
pub struct SeaOrmFaceService {
    store: Arc<Store>,
    codec: Arc<TokenCodec>,
    embedder: Arc<dyn FaceEmbedder>,
    security: SecurityConfig,
    max_file_size: usize,
    threshold: f64,
}

impl SeaOrmFaceService {
    pub fn new(
        store: Arc<Store>,
        codec: Arc<TokenCodec>,
        embedder: Arc<dyn FaceEmbedder>,
        security: SecurityConfig,
        max_file_size: usize,
        threshold: f64,
    ) -> Self {
        Self {
            store,
            codec,
            embedder,
            security,
            max_file_size,
            threshold,
        }
    }

    fn check_image(&self, image: &[u8]) -> Result<(), FaceError> {
        if image.is_empty() {
            return Err(FaceError::EmptyFile);
        }
        if image.len() > self.max_file_size {
            return Err(FaceError::FileTooLarge {
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Embeds the image and validates the resulting vector.
    async fn compute(&self, image: &[u8]) -> Result<Vec<f32>, FaceError> {
        let vector = self.embedder.embed(image).await?;
        matcher::validate(&vector)?;
        Ok(vector)
    }

    /// Resolves the account being verified. An unknown email and a disabled
    /// account are reported the same way.
    async fn resolve_user(&self, email: &str) -> Result<i32, FaceError> {
        let user = self
            .store
            .get_user_by_email(email)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?
            .ok_or(FaceError::IncorrectCredentials)?;

        if !user.is_active {
            return Err(FaceError::IncorrectCredentials);
        }
        if !user.email_confirmed {
            return Err(FaceError::EmailNotConfirmed);
        }
        Ok(user.id)
    }

    fn validate_pin(pin: &str) -> Result<(), FaceError> {
        if pin.len() < MIN_PIN_LEN
            || pin.len() > MAX_PIN_LEN
            || !pin.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(FaceError::Validation(format!(
                "PIN must be {MIN_PIN_LEN}-{MAX_PIN_LEN} alphanumeric characters"
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl FaceService for SeaOrmFaceService {
    async fn enroll(
        &self,
        user_id: i32,
        image: Vec<u8>,
        meta: Option<String>,
    ) -> Result<i32, FaceError> {
        self.check_image(&image)?;
        let vector = self.compute(&image).await?;

        let embedding_id = self
            .store
            .upsert_embedding(user_id, &vector, meta)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?;

        info!("enrolled face embedding {embedding_id} for user {user_id}");
        Ok(embedding_id)
    }

    async fn verify(&self, email: &str, image: Vec<u8>) -> Result<VerifyOutcome, FaceError> {
        let user_id = self.resolve_user(email).await?;
        self.check_image(&image)?;
        let probe = self.compute(&image).await?;

        let stored = self
            .store
            .get_embedding_by_user(user_id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?
            .ok_or(FaceError::NoEmbeddingForUser)?;

        let distance = matcher::distance(&probe, &stored.vector)?;
        debug!("face distance for user {user_id}: {distance:.4}");

        if !matcher::is_match(distance, self.threshold) {
            return Err(FaceError::VerificationFailed);
        }

        let pin = self
            .store
            .get_pin_by_embedding(stored.id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?;

        if pin.is_some() {
            Ok(VerifyOutcome::PinChallenge {
                user_id,
                embedding_id: stored.id,
            })
        } else {
            Ok(VerifyOutcome::Tokens(
                self.codec.issue_pair(&user_id.to_string())?,
            ))
        }
    }

    async fn verify_pin(&self, user_id: i32, pin: &str) -> Result<TokenPair, FaceError> {
        let stored = self
            .store
            .get_embedding_by_user(user_id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?
            .ok_or(FaceError::NoEmbeddingForUser)?;

        let stored_pin = self
            .store
            .get_pin_by_embedding(stored.id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?
            .ok_or(FaceError::PinNotFound)?;

        let matches =
            credentials::verify_secret_blocking(pin.to_string(), stored_pin.pin_hash).await?;
        if !matches {
            return Err(FaceError::InvalidPin);
        }

        Ok(self.codec.issue_pair(&user_id.to_string())?)
    }

    async fn create_pin(&self, user_id: i32, pin: &str) -> Result<(), FaceError> {
        Self::validate_pin(pin)?;

        let stored = self
            .store
            .get_embedding_by_user(user_id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?
            .ok_or(FaceError::NoEmbeddingForUser)?;

        if self
            .store
            .get_pin_by_embedding(stored.id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?
            .is_some()
        {
            return Err(FaceError::PinAlreadyExists);
        }

        let pin_hash =
            credentials::hash_secret_blocking(pin.to_string(), self.security.clone()).await?;

        // The unique index on embedding_id backstops a concurrent create.
        self.store
            .insert_pin(stored.id, pin_hash)
            .await
            .map_err(|_| FaceError::PinAlreadyExists)?;

        info!("attached PIN to embedding {} (user {user_id})", stored.id);
        Ok(())
    }

    async fn delete_pin(&self, user_id: i32) -> Result<(), FaceError> {
        let stored = self
            .store
            .get_embedding_by_user(user_id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?
            .ok_or(FaceError::NoEmbeddingForUser)?;

        let removed = self
            .store
            .delete_pin_by_embedding(stored.id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?;
        if !removed {
            return Err(FaceError::PinNotFound);
        }
        info!("removed PIN from embedding {} (user {user_id})", stored.id);
        Ok(())
    }

    async fn pin_status(&self, user_id: i32) -> Result<PinStatus, FaceError> {
        let stored = self
            .store
            .get_embedding_by_user(user_id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?
            .ok_or(FaceError::NoEmbeddingForUser)?;

        let has_pin = self
            .store
            .get_pin_by_embedding(stored.id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?
            .is_some();
        Ok(PinStatus { has_pin })
    }

    async fn delete_embedding(&self, user_id: i32) -> Result<bool, FaceError> {
        let Some(stored) = self
            .store
            .get_embedding_by_user(user_id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?
        else {
            return Ok(false);
        };

        // PIN rows reference the embedding, so they go first.
        self.store
            .delete_pin_by_embedding(stored.id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?;
        let removed = self
            .store
            .delete_embedding_by_user(user_id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?;

        if removed {
            info!("deleted face embedding for user {user_id}");
        }
        Ok(removed)
    }

    async fn embedding_status(&self, user_id: i32) -> Result<bool, FaceError> {
        Ok(self
            .store
            .get_embedding_by_user(user_id)
            .await
            .map_err(|e| FaceError::Database(e.to_string()))?
            .is_some())
    }
}
