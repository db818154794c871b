use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
};

use crate::entities::face_pins;

#[derive(Debug, Clone)]
pub struct StoredPin {
    pub id: i32,
    pub embedding_id: i32,
    pub pin_hash: String,
}

impl From<face_pins::Model> for StoredPin {
    fn from(model: face_pins::Model) -> Self {
        Self {
            id: model.id,
            embedding_id: model.embedding_id,
            pin_hash: model.pin_hash,
        }
    }
}

pub struct PinRepository {
    conn: DatabaseConnection,
}

impl PinRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_embedding(&self, embedding_id: i32) -> Result<Option<StoredPin>> {
        let pin = face_pins::Entity::find()
            .filter(face_pins::Column::EmbeddingId.eq(embedding_id))
            .one(&self.conn)
            .await
            .context("Failed to query PIN by embedding")?;

        Ok(pin.map(StoredPin::from))
    }

    /// Callers check for an existing PIN first; the unique index on
    /// `embedding_id` is the backstop against races.
    pub async fn insert(&self, embedding_id: i32, pin_hash: String) -> Result<i32> {
        let active = face_pins::ActiveModel {
            embedding_id: Set(embedding_id),
            pin_hash: Set(pin_hash),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let inserted = active
            .insert(&self.conn)
            .await
            .context("Failed to insert PIN")?;

        Ok(inserted.id)
    }

    /// Returns whether a row existed.
    pub async fn delete_by_embedding(&self, embedding_id: i32) -> Result<bool> {
        let pin = face_pins::Entity::find()
            .filter(face_pins::Column::EmbeddingId.eq(embedding_id))
            .one(&self.conn)
            .await
            .context("Failed to query PIN for deletion")?;

        let Some(pin) = pin else {
            return Ok(false);
        };

        pin.delete(&self.conn)
            .await
            .context("Failed to delete PIN")?;

        Ok(true)
    }
}
