//! The shared survey store: the in-memory document plus its session
//! storage mirror.

use crate::document::{SurveyDocument, TelemetryEvent, unix_millis};
use crate::storage::{DOCUMENT_KEY, SharedStorage};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub type SharedStore = Arc<Mutex<SurveyStore>>;

pub struct SurveyStore {
    doc: SurveyDocument,
    storage: SharedStorage,
}

impl SurveyStore {
    /// Restore the document from session storage, or start fresh.
    pub fn new(storage: SharedStorage) -> Self {
        let doc = storage
            .lock()
            .expect("storage lock poisoned")
            .get(DOCUMENT_KEY)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();
        Self { doc, storage }
    }

    pub fn shared(storage: SharedStorage) -> SharedStore {
        Arc::new(Mutex::new(Self::new(storage)))
    }

    pub fn document(&self) -> &SurveyDocument {
        &self.doc
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Apply a mutation and mirror the document to session storage.
    pub fn update<F: FnOnce(&mut SurveyDocument)>(&mut self, f: F) {
        f(&mut self.doc);
        self.persist();
    }

    /// Record a Likert answer. Returns false (and stores nothing) for a
    /// value outside 1..=7.
    pub fn set_likert(&mut self, item_id: &str, value: u8) -> bool {
        if !(1..=7).contains(&value) {
            return false;
        }
        self.update(|doc| {
            doc.likert.insert(item_id.to_string(), value);
        });
        true
    }

    pub fn log_event(&mut self, event: TelemetryEvent) {
        self.update(|doc| doc.telemetry.push(event));
    }

    pub fn set_story_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.update(|doc| doc.writing.story_text = text);
    }

    /// Stamp the start of the writing task, once.
    pub fn mark_task_started(&mut self) {
        if self.doc.writing.started_at.is_none() {
            self.update(|doc| doc.writing.started_at = Some(unix_millis()));
        }
    }

    /// Drop all local state: the document and its storage mirror.
    pub fn reset(&mut self) {
        self.doc = SurveyDocument::default();
        self.storage
            .lock()
            .expect("storage lock poisoned")
            .remove(DOCUMENT_KEY);
    }

    fn persist(&self) {
        match serde_json::to_string(&self.doc) {
            Ok(json) => self
                .storage
                .lock()
                .expect("storage lock poisoned")
                .set(DOCUMENT_KEY, &json),
            Err(e) => warn!("failed to serialize survey document: {}", e),
        }
    }
}
