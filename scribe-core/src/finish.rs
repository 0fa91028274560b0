//! Completion: mark the participant finished and clear local state.

use crate::client::BackendClient;
use crate::storage::{DOCUMENT_KEY, PARTICIPANT_KEY, SharedStorage};
use crate::store::SharedStore;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct Finalizer {
    storage: SharedStorage,
    backend: Arc<dyn BackendClient>,
}

impl Finalizer {
    pub fn new(storage: SharedStorage, backend: Arc<dyn BackendClient>) -> Self {
        Self { storage, backend }
    }

    /// Finish the run. Local state is cleared even when the backend call
    /// fails, so a participant is never trapped on the final page.
    /// Returns the backend-computed duration in seconds when available.
    #[instrument(skip(self, store))]
    pub async fn finish(&self, store: &SharedStore) -> Option<u64> {
        let participant_id = self
            .storage
            .lock()
            .expect("storage lock poisoned")
            .get(PARTICIPANT_KEY);

        let duration = match participant_id {
            Some(id) => match self.backend.complete(&id).await {
                Ok(seconds) => {
                    info!("participant {} completed in {}s", id, seconds);
                    Some(seconds)
                }
                Err(e) => {
                    warn!("completion failed for {}: {}", id, e);
                    None
                }
            },
            None => None,
        };

        {
            let mut guard = self.storage.lock().expect("storage lock poisoned");
            guard.remove(PARTICIPANT_KEY);
            guard.remove(DOCUMENT_KEY);
        }
        store.lock().expect("store lock poisoned").reset();

        duration
    }
}
