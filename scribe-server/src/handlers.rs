//! HTTP handlers for the survey API.

use crate::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::State;
use llm::api::{ChatMessage, ChatRequest, Role};
use scribe_core::fields;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, instrument, warn};

/// Only this many trailing transcript messages are relayed upstream.
pub const CHAT_HISTORY_WINDOW: usize = 12;

pub async fn health() -> &'static str {
    "ok"
}

#[instrument(skip(state))]
pub async fn create_participant(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let id = state.db.create_participant()?;
    info!("created participant {}", id);
    Ok(Json(json!({ "participant_id": id })))
}

/// The update payload is flat: `id` plus any answer fields. Unknown
/// field names are silently discarded, never an error — a stale client
/// must not lose the rest of a participant's answers.
#[instrument(skip(state, payload))]
pub async fn update_survey(
    State(state): State<AppState>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let participant_id = payload
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("id is required".to_string()))?
        .to_string();

    // "id" is not on the allow-list, so it drops out here.
    let normalized = fields::normalize(&payload);
    if normalized.is_empty() {
        return Ok(Json(json!({ "success": true, "updated": 0 })));
    }

    state.db.update_fields(&participant_id, &normalized)?;
    Ok(Json(json!({ "success": true, "updated": normalized.len() })))
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub participant_id: Option<String>,
}

#[instrument(skip(state, request))]
pub async fn complete_participant(
    State(state): State<AppState>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<Value>, ApiError> {
    let participant_id = request
        .participant_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("participant_id is required".to_string()))?;

    let seconds = state.db.complete_participant(&participant_id)?;
    info!("participant {} completed in {}s", participant_id, seconds);
    Ok(Json(json!({ "success": true, "duration": seconds })))
}

#[derive(Deserialize)]
pub struct ChatProxyRequest {
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
}

#[derive(Deserialize)]
pub struct IncomingMessage {
    pub role: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// Relay the tail of the transcript to the assistant model. Roles other
/// than "assistant" are sent as user turns so a malformed client can
/// never inject system messages.
#[instrument(skip(state, request), fields(messages = request.messages.len()))]
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatProxyRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.messages.is_empty() {
        return Err(ApiError::Validation("messages must not be empty".to_string()));
    }
    let Some(model) = &state.model else {
        return Err(ApiError::Upstream("no assistant model configured".to_string()));
    };

    // Drop empty-content messages first, then take the trailing window,
    // so an empty turn never shrinks the context sent upstream.
    let filtered: Vec<ChatMessage> = request
        .messages
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| {
            let role = match m.role.as_deref() {
                Some("assistant") => Role::Assistant,
                _ => Role::User,
            };
            ChatMessage::new(role, m.content.trim())
        })
        .collect();
    if filtered.is_empty() {
        return Err(ApiError::Validation("messages must not be empty".to_string()));
    }
    let start = filtered.len().saturating_sub(CHAT_HISTORY_WINDOW);

    let reply = model
        .chat(&ChatRequest::new(&filtered[start..]))
        .await
        .map_err(|e| {
            warn!("assistant relay failed: {}", e);
            ApiError::Upstream(e.to_string())
        })?;

    Ok(Json(json!({ "reply": reply.content })))
}

#[derive(Deserialize)]
pub struct ChatLogRequest {
    pub participant_id: Option<String>,
    pub turn_index: Option<i64>,
    pub role: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[instrument(skip(state, request))]
pub async fn append_chat_log(
    State(state): State<AppState>,
    Json(request): Json<ChatLogRequest>,
) -> Result<Json<Value>, ApiError> {
    let participant_id = request
        .participant_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("participant_id is required".to_string()))?;
    let turn_index = request
        .turn_index
        .filter(|i| *i >= 0)
        .ok_or_else(|| ApiError::Validation("turn_index is required".to_string()))?;
    let content = request.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("content must not be empty".to_string()));
    }
    let role = match request.role.as_deref() {
        Some("assistant") => "assistant",
        _ => "user",
    };

    state
        .db
        .append_chat_log(&participant_id, turn_index, role, content)?;
    Ok(Json(json!({ "success": true })))
}
