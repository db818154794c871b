use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "face_pins")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// 0..1 PIN per embedding; duplicates are rejected, never overwritten.
    #[sea_orm(unique)]
    pub embedding_id: i32,

    /// Argon2id PIN hash
    pub pin_hash: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::face_embeddings::Entity",
        from = "Column::EmbeddingId",
        to = "super::face_embeddings::Column::Id"
    )]
    FaceEmbedding,
}

impl Related<super::face_embeddings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FaceEmbedding.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
