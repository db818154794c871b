use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub login: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub is_active: bool,

    pub email_confirmed: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::face_embeddings::Entity")]
    FaceEmbeddings,
}

impl Related<super::face_embeddings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FaceEmbeddings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
