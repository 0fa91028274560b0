use anyhow::{Context, Result};
use config::{PathManager, Settings, load_env_file};
use llm::ChatModel;
use llm::providers::openai::OpenAIProvider;
use scribe_server::db::Database;
use scribe_server::{AppState, router};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load();
    PathManager::ensure_dirs_exist().context("Failed to create data directories")?;

    let db_path = settings
        .database_path
        .clone()
        .or_else(PathManager::db_path)
        .context("Could not determine database path")?;
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    info!("database at {}", db_path.display());

    let api_key = settings
        .get_api_key("openai")
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());
    let model = api_key.map(|key| {
        let provider = OpenAIProvider::default(&key);
        Arc::new(provider.create_chat_model(settings.model())) as Arc<dyn ChatModel + Send + Sync>
    });
    if model.is_none() {
        warn!("no OpenAI API key configured; the chat endpoint will answer 502");
    }

    let state = AppState::new(db, model);
    let addr = format!("0.0.0.0:{}", settings.port());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
