//! Participant identity for one survey run.

use crate::client::BackendClient;
use crate::error::SessionError;
use crate::storage::{PARTICIPANT_KEY, SharedStorage};
use std::sync::Arc;
use tracing::{info, instrument};

/// Holds the backend-issued participant id for the current run.
pub struct ParticipantSession {
    storage: SharedStorage,
    backend: Arc<dyn BackendClient>,
}

impl ParticipantSession {
    pub fn new(storage: SharedStorage, backend: Arc<dyn BackendClient>) -> Self {
        Self { storage, backend }
    }

    pub fn participant_id(&self) -> Option<String> {
        self.storage
            .lock()
            .expect("storage lock poisoned")
            .get(PARTICIPANT_KEY)
    }

    /// Return the existing participant id, creating one on the backend
    /// only if this run does not have one yet.
    #[instrument(skip(self))]
    pub async fn ensure_participant(&self) -> Result<String, SessionError> {
        if let Some(id) = self.participant_id() {
            return Ok(id);
        }

        let id = self
            .backend
            .create_participant()
            .await
            .map_err(|e| SessionError::ParticipantCreation(e.to_string()))?;

        info!("created participant {}", id);
        self.storage
            .lock()
            .expect("storage lock poisoned")
            .set(PARTICIPANT_KEY, &id);
        Ok(id)
    }

    pub fn clear(&self) {
        self.storage
            .lock()
            .expect("storage lock poisoned")
            .remove(PARTICIPANT_KEY);
    }
}
