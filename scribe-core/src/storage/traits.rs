use std::sync::{Arc, Mutex};

/// Storage key for the serialized [`crate::SurveyDocument`].
pub const DOCUMENT_KEY: &str = "survey_document";
/// Storage key for the backend-issued participant id.
pub const PARTICIPANT_KEY: &str = "participant_id";
/// Storage key for the persisted post-task block order.
pub const POST_A_ORDER_KEY: &str = "post_a_order";

/// Per-run key/value storage, the analogue of a browser tab's session
/// storage. Implementations are plain and synchronous; callers share one
/// behind [`SharedStorage`] and never hold the lock across an await.
pub trait SessionStorage: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
    fn clear(&mut self);
}

pub type SharedStorage = Arc<Mutex<dyn SessionStorage + Send>>;
