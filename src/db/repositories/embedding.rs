use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
};

use crate::entities::face_embeddings;

/// Stored embedding row with the vector decoded from its blob form.
#[derive(Debug, Clone)]
pub struct StoredEmbedding {
    pub id: i32,
    pub user_id: i32,
    pub vector: Vec<f32>,
    pub meta: Option<String>,
    pub created_at: String,
}

pub struct EmbeddingRepository {
    conn: DatabaseConnection,
}

impl EmbeddingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_user(&self, user_id: i32) -> Result<Option<StoredEmbedding>> {
        let row = face_embeddings::Entity::find()
            .filter(face_embeddings::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query embedding by user")?;

        row.map(|r| {
            Ok(StoredEmbedding {
                id: r.id,
                user_id: r.user_id,
                vector: decode_vector(&r.embedding)?,
                meta: r.meta,
                created_at: r.created_at,
            })
        })
        .transpose()
    }

    /// Insert-or-replace: enrolling again overwrites the stored vector, it
    /// never adds a second row. Returns the embedding id.
    pub async fn upsert(
        &self,
        user_id: i32,
        vector: &[f32],
        meta: Option<String>,
    ) -> Result<i32> {
        let blob = encode_vector(vector);

        let existing = face_embeddings::Entity::find()
            .filter(face_embeddings::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query embedding for upsert")?;

        if let Some(row) = existing {
            let id = row.id;
            let mut active: face_embeddings::ActiveModel = row.into();
            active.embedding = Set(blob);
            if meta.is_some() {
                active.meta = Set(meta);
            }
            active
                .update(&self.conn)
                .await
                .context("Failed to update embedding")?;
            return Ok(id);
        }

        let active = face_embeddings::ActiveModel {
            user_id: Set(user_id),
            embedding: Set(blob),
            meta: Set(meta),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let inserted = active
            .insert(&self.conn)
            .await
            .context("Failed to insert embedding")?;

        Ok(inserted.id)
    }

    /// Returns whether a row existed.
    pub async fn delete_by_user(&self, user_id: i32) -> Result<bool> {
        let row = face_embeddings::Entity::find()
            .filter(face_embeddings::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query embedding for deletion")?;

        let Some(row) = row else {
            return Ok(false);
        };

        row.delete(&self.conn)
            .await
            .context("Failed to delete embedding")?;

        Ok(true)
    }
}

/// Vectors are persisted as little-endian f32 blobs.
#[must_use]
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        blob.extend_from_slice(&v.to_le_bytes());
    }
    blob
}

pub fn decode_vector(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        anyhow::bail!("Corrupt embedding blob: {} bytes", blob.len());
    }

    Ok(blob
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
