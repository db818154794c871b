//! Keyed persistence layer. Each `Store` call is one short-lived logical
//! operation; no multi-call transaction spans a network round trip.

use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::embedding::StoredEmbedding;
pub use repositories::pin::StoredPin;
pub use repositories::user::{NewUser, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn embedding_repo(&self) -> repositories::embedding::EmbeddingRepository {
        repositories::embedding::EmbeddingRepository::new(self.conn.clone())
    }

    fn pin_repo(&self) -> repositories::pin::PinRepository {
        repositories::pin::PinRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_email_with_password(email).await
    }

    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<User>> {
        self.user_repo().get_by_login(login).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn insert_user(&self, new_user: NewUser) -> Result<i32> {
        self.user_repo().insert(new_user).await
    }

    pub async fn confirm_user_email(&self, email: &str) -> Result<bool> {
        self.user_repo().confirm_email(email).await
    }

    pub async fn update_user_password(&self, email: &str, new_hash: String) -> Result<bool> {
        self.user_repo().update_password(email, new_hash).await
    }

    // Face embeddings

    pub async fn get_embedding_by_user(&self, user_id: i32) -> Result<Option<StoredEmbedding>> {
        self.embedding_repo().get_by_user(user_id).await
    }

    pub async fn upsert_embedding(
        &self,
        user_id: i32,
        vector: &[f32],
        meta: Option<String>,
    ) -> Result<i32> {
        self.embedding_repo().upsert(user_id, vector, meta).await
    }

    pub async fn delete_embedding_by_user(&self, user_id: i32) -> Result<bool> {
        self.embedding_repo().delete_by_user(user_id).await
    }

    // Face PINs

    pub async fn get_pin_by_embedding(&self, embedding_id: i32) -> Result<Option<StoredPin>> {
        self.pin_repo().get_by_embedding(embedding_id).await
    }

    pub async fn insert_pin(&self, embedding_id: i32, pin_hash: String) -> Result<i32> {
        self.pin_repo().insert(embedding_id, pin_hash).await
    }

    pub async fn delete_pin_by_embedding(&self, embedding_id: i32) -> Result<bool> {
        self.pin_repo().delete_by_embedding(embedding_id).await
    }
}
