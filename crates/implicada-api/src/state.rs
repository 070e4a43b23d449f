//! Application state wiring all services together.
//!
//! `ChatService` is generic over its collaborators; AppState pins the
//! generics to the concrete infra implementations and shares them across
//! handlers.

use std::path::PathBuf;
use std::sync::Arc;

use implicada_core::chat::service::ChatService;
use implicada_core::persona::PersonaProfile;
use implicada_infra::config::{load_engine_config, load_service_secrets, resolve_data_dir};
use implicada_infra::gemini::{GeminiClient, GeminiEmbedder, GeminiGenerator};
use implicada_infra::search::RpcSearchIndex;
use implicada_infra::sqlite::pool::DatabasePool;
use implicada_infra::sqlite::session::SqliteSessionRepository;
use implicada_infra::sqlite::turn::SqliteTurnRepository;
use implicada_infra::sqlite::user::SqliteUserRepository;

/// Concrete type alias for the chat service pinned to infra implementations.
pub type ConcreteChatService = ChatService<
    SqliteSessionRepository,
    SqliteTurnRepository,
    GeminiGenerator,
    GeminiEmbedder,
    RpcSearchIndex,
>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub user_repo: Arc<SqliteUserRepository>,
    pub db_pool: DatabasePool,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: connect to the database, load
    /// config and secrets, wire the pipeline.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        // Initialize database
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("implicada.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        let config = load_engine_config(&data_dir).await;
        let secrets = load_service_secrets()?;

        // External service clients
        let gemini = GeminiClient::new(secrets.gemini_api_key);
        let generator = GeminiGenerator::new(gemini.clone());
        let embedder = GeminiEmbedder::new(
            gemini,
            config.embedding_model.clone(),
            config.embedding_dimensions,
        );
        let index = RpcSearchIndex::new(
            secrets.retrieval_base_url,
            secrets.retrieval_service_key,
        );

        // Wire the chat service with its repositories and collaborators
        let chat_service = ChatService::new(
            SqliteSessionRepository::new(db_pool.clone()),
            SqliteTurnRepository::new(db_pool.clone()),
            generator,
            embedder,
            index,
            PersonaProfile::default(),
            config,
        );

        let user_repo = SqliteUserRepository::new(db_pool.clone());

        Ok(Self {
            chat_service: Arc::new(chat_service),
            user_repo: Arc::new(user_repo),
            db_pool,
            data_dir,
        })
    }
}
