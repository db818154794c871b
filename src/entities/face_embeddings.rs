use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "face_embeddings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// At most one embedding per user; enrollment overwrites in place.
    #[sea_orm(unique)]
    pub user_id: i32,

    /// Little-endian f32 vector, `embedding_dim` values.
    pub embedding: Vec<u8>,

    pub meta: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,

    #[sea_orm(has_many = "super::face_pins::Entity")]
    FacePins,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::face_pins::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FacePins.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
