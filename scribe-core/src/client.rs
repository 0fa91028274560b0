//! HTTP client for the survey backend.

use crate::error::BackendError;
use async_trait::async_trait;
use llm::api::{ChatMessage, Role};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;

/// The backend operations the client-side engine needs. Abstracted so
/// tests can substitute a recording or failing implementation.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Create a participant record; returns the new participant id.
    async fn create_participant(&self) -> Result<String, BackendError>;

    /// Merge normalized survey fields into the participant's record.
    async fn update_survey(
        &self,
        participant_id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), BackendError>;

    /// Mark the participant finished; returns total duration in seconds.
    async fn complete(&self, participant_id: &str) -> Result<u64, BackendError>;

    /// Relay the transcript to the assistant and return its reply.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, BackendError>;

    /// Append one chat turn to the participant's durable chat log.
    async fn log_chat_turn(
        &self,
        participant_id: &str,
        turn_index: usize,
        role: Role,
        content: &str,
    ) -> Result<(), BackendError>;
}

/// [`BackendClient`] over the backend's HTTP surface.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CreateResponse {
    participant_id: Option<String>,
}

#[derive(Deserialize)]
struct CompleteResponse {
    duration: Option<u64>,
}

#[derive(Deserialize)]
struct ChatResponse {
    reply: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check_status(status: reqwest::StatusCode) -> Result<(), BackendError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    #[instrument(skip(self))]
    async fn create_participant(&self) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.url("/api/participants"))
            .json(&json!({}))
            .send()
            .await?;
        Self::check_status(response.status())?;

        let body: CreateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        body.participant_id
            .ok_or_else(|| BackendError::Malformed("missing participant_id".to_string()))
    }

    #[instrument(skip(self, fields))]
    async fn update_survey(
        &self,
        participant_id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), BackendError> {
        // The wire payload is flat: "id" plus the answer fields.
        let mut payload = fields;
        payload.insert("id".to_string(), Value::String(participant_id.to_string()));

        let response = self
            .client
            .post(self.url("/api/survey/update"))
            .json(&payload)
            .send()
            .await?;
        Self::check_status(response.status())
    }

    #[instrument(skip(self))]
    async fn complete(&self, participant_id: &str) -> Result<u64, BackendError> {
        let response = self
            .client
            .post(self.url("/api/participants/complete"))
            .json(&json!({ "participant_id": participant_id }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::ParticipantNotFound);
        }
        Self::check_status(response.status())?;

        let body: CompleteResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        Ok(body.duration.unwrap_or(0))
    }

    #[instrument(skip(self, messages), fields(messages = messages.len()))]
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let payload: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&json!({ "messages": payload }))
            .send()
            .await?;
        Self::check_status(response.status())?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        body.reply
            .ok_or_else(|| BackendError::Malformed("missing reply".to_string()))
    }

    #[instrument(skip(self, content))]
    async fn log_chat_turn(
        &self,
        participant_id: &str,
        turn_index: usize,
        role: Role,
        content: &str,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url("/api/chatlog"))
            .json(&json!({
                "participant_id": participant_id,
                "turn_index": turn_index,
                "role": role.as_str(),
                "content": content,
            }))
            .send()
            .await?;
        Self::check_status(response.status())
    }
}
