//! The survey backend: a thin HTTP layer over SQLite plus a chat proxy
//! that keeps the model API key server-side.

pub mod db;
pub mod error;
pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use db::Database;
use llm::ChatModel;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Assistant model; `None` when no API key is configured, in which
    /// case the chat endpoint answers 502 and clients fall back.
    pub model: Option<Arc<dyn ChatModel + Send + Sync>>,
}

impl AppState {
    pub fn new(db: Database, model: Option<Arc<dyn ChatModel + Send + Sync>>) -> Self {
        Self { db, model }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/participants", post(handlers::create_participant))
        .route("/api/survey/update", post(handlers::update_survey))
        .route(
            "/api/participants/complete",
            post(handlers::complete_participant),
        )
        .route("/api/chat", post(handlers::chat))
        .route("/api/chatlog", post(handlers::append_chat_log))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
