//! Fire-and-forget field sync to the backend.
//!
//! Every answer is pushed as it is entered; a failed push never
//! interrupts the participant, since local state is still the source of
//! truth until completion.

use crate::client::BackendClient;
use crate::fields;
use crate::storage::{PARTICIPANT_KEY, SharedStorage};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

pub struct Autosave {
    storage: SharedStorage,
    backend: Arc<dyn BackendClient>,
}

impl Autosave {
    pub fn new(storage: SharedStorage, backend: Arc<dyn BackendClient>) -> Self {
        Self { storage, backend }
    }

    fn participant_id(&self) -> Option<String> {
        self.storage
            .lock()
            .expect("storage lock poisoned")
            .get(PARTICIPANT_KEY)
    }

    /// Push one field. Returns the spawned task handle, or `None` when
    /// there is no participant yet or the field is not persistable.
    pub fn sync_field(&self, name: &str, value: Value) -> Option<JoinHandle<()>> {
        let mut payload = Map::new();
        payload.insert(name.to_string(), value);
        self.sync_block(payload)
    }

    /// Push a batch of fields after normalization.
    pub fn sync_block(&self, payload: Map<String, Value>) -> Option<JoinHandle<()>> {
        let participant_id = self.participant_id()?;
        let normalized = fields::normalize(&payload);
        if normalized.is_empty() {
            return None;
        }

        let backend = self.backend.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = backend.update_survey(&participant_id, normalized).await {
                warn!("autosave failed for {}: {}", participant_id, e);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use llm::api::{ChatMessage, Role};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        updates: Mutex<Vec<(String, Map<String, Value>)>>,
    }

    #[async_trait]
    impl BackendClient for RecordingBackend {
        async fn create_participant(&self) -> Result<String, BackendError> {
            Ok("p1".to_string())
        }

        async fn update_survey(
            &self,
            participant_id: &str,
            fields: Map<String, Value>,
        ) -> Result<(), BackendError> {
            self.updates
                .lock()
                .unwrap()
                .push((participant_id.to_string(), fields));
            Ok(())
        }

        async fn complete(&self, _participant_id: &str) -> Result<u64, BackendError> {
            Ok(0)
        }

        async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, BackendError> {
            Ok(String::new())
        }

        async fn log_chat_turn(
            &self,
            _participant_id: &str,
            _turn_index: usize,
            _role: Role,
            _content: &str,
        ) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn storage_with_participant() -> SharedStorage {
        let storage: SharedStorage = Arc::new(Mutex::new(MemoryStorage::new()));
        storage.lock().unwrap().set(PARTICIPANT_KEY, "p1");
        storage
    }

    #[tokio::test]
    async fn test_sync_field_reaches_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let autosave = Autosave::new(storage_with_participant(), backend.clone());

        let handle = autosave.sync_field("wse1", json!(5)).unwrap();
        handle.await.unwrap();

        let updates = backend.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "p1");
        assert_eq!(updates[0].1.get("wse1"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn test_no_participant_no_push() {
        let backend = Arc::new(RecordingBackend::default());
        let storage: SharedStorage = Arc::new(Mutex::new(MemoryStorage::new()));
        let autosave = Autosave::new(storage, backend.clone());

        assert!(autosave.sync_field("wse1", json!(5)).is_none());
        assert!(backend.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disallowed_fields_never_sent() {
        let backend = Arc::new(RecordingBackend::default());
        let autosave = Autosave::new(storage_with_participant(), backend.clone());

        assert!(autosave.sync_field("internal_debug", json!(1)).is_none());

        let mut payload = Map::new();
        payload.insert("bogus".to_string(), json!(1));
        payload.insert("email".to_string(), json!("a@b"));
        let handle = autosave.sync_block(payload).unwrap();
        handle.await.unwrap();

        let updates = backend.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.len(), 1);
        assert!(updates[0].1.contains_key("email"));
    }
}
