use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::embedder::{FaceEmbedder, LocalEmbedder};
use crate::mailer::{self, Mailer};
use crate::services::{
    AuthService, FaceService, SeaOrmAuthService, SeaOrmFaceService,
};
use crate::tokens::TokenCodec;

/// Long-lived collaborators shared by every request handler. Everything in
/// here is immutable after construction.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Arc<Store>,

    pub codec: Arc<TokenCodec>,

    pub embedder: Arc<dyn FaceEmbedder>,

    pub mailer: Option<Arc<dyn Mailer>>,

    pub auth_service: Arc<dyn AuthService>,

    pub face_service: Arc<dyn FaceService>,
}

impl SharedState {
    /// Builds the full production state. The embedding model is loaded here,
    /// before the server accepts any traffic, so a bad weights file fails
    /// startup instead of the first request.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let embedder = Arc::new(LocalEmbedder::load(
            &config.face.model_weights_path,
            config.face.embedding_dim,
        )?) as Arc<dyn FaceEmbedder>;

        Self::with_embedder(config, embedder).await
    }

    /// Same as [`SharedState::new`] but with an externally supplied embedder.
    pub async fn with_embedder(
        config: Config,
        embedder: Arc<dyn FaceEmbedder>,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(
            Store::with_pool_options(
                &config.general.database_path,
                config.general.max_db_connections,
                config.general.min_db_connections,
            )
            .await?,
        );

        let codec = Arc::new(TokenCodec::new(&config.tokens));
        let mailer = mailer::from_config(&config.email)?;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            codec.clone(),
            mailer.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let face_service = Arc::new(SeaOrmFaceService::new(
            store.clone(),
            codec.clone(),
            embedder.clone(),
            config.security.clone(),
            config.face.max_file_size(),
            config.face.match_threshold,
        )) as Arc<dyn FaceService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            codec,
            embedder,
            mailer,
            auth_service,
            face_service,
        })
    }
}
