//! The assistant chat session for the writing task.
//!
//! One prompt at a time: the user turn is appended and logged, the
//! transcript is relayed to the backend, and the reply is revealed in
//! fixed-size chunks to read like live typing. A failed relay shows a
//! canned apology that is never written to the durable chat log.

use crate::client::BackendClient;
use crate::document::{ChatTurn, unix_millis};
use crate::error::ChatError;
use crate::storage::{PARTICIPANT_KEY, SharedStorage};
use crate::store::SharedStore;
use llm::api::{ChatMessage, Role};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{instrument, warn};

/// Characters revealed per step of the simulated typing.
pub const REVEAL_CHUNK_CHARS: usize = 20;
/// Pause between reveal steps.
pub const REVEAL_INTERVAL: Duration = Duration::from_millis(15);

/// Shown in the transcript when the assistant cannot answer.
pub const FALLBACK_REPLY: &str = "（系統暫時無法回應，請稍後再試）";
/// Any assistant content containing this marker is kept out of the
/// durable chat log.
pub const FALLBACK_MARKER: &str = "系統暫時無法回應";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    /// Waiting for the backend reply.
    Reasoning,
    /// Revealing the reply chunk by chunk.
    Typing,
}

#[derive(Debug, Clone)]
pub enum ChatEvent {
    Reasoning,
    /// The reply text revealed so far.
    Typing(String),
    Completed { reply: String, fallback: bool },
}

pub struct ChatSession {
    store: SharedStore,
    storage: SharedStorage,
    backend: Arc<dyn BackendClient>,
    phase: ChatPhase,
    event_tx: Option<UnboundedSender<ChatEvent>>,
    pending: Vec<JoinHandle<()>>,
}

impl ChatSession {
    pub fn new(store: SharedStore, storage: SharedStorage, backend: Arc<dyn BackendClient>) -> Self {
        Self {
            store,
            storage,
            backend,
            phase: ChatPhase::Idle,
            event_tx: None,
            pending: Vec::new(),
        }
    }

    /// Receive phase and reveal events for the UI.
    pub fn subscribe(&mut self) -> UnboundedReceiver<ChatEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.event_tx = Some(tx);
        rx
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    /// Send one prompt and reveal the reply. Returns once the reveal has
    /// finished; durable logging runs in the background (see [`flush`]).
    ///
    /// [`flush`]: ChatSession::flush
    #[instrument(skip(self, prompt))]
    pub async fn send(&mut self, prompt: &str) -> Result<(), ChatError> {
        if self.phase != ChatPhase::Idle {
            return Err(ChatError::Busy);
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }

        // The durable turn index is the live transcript length before the
        // user turn is appended.
        let (turn_index, transcript) = {
            let mut store = self.store.lock().expect("store lock poisoned");
            let turn_index = store.document().chat.turns.len();
            let prompt_chars = prompt.chars().count();
            store.update(|doc| {
                doc.chat.turns.push(ChatTurn::user(prompt));
                doc.chat.stats.prompt_count += 1;
                doc.chat.stats.total_prompt_chars += prompt_chars;
            });
            let transcript: Vec<ChatMessage> = store
                .document()
                .chat
                .turns
                .iter()
                .map(|t| ChatMessage::new(t.role, t.content.clone()))
                .collect();
            (turn_index, transcript)
        };

        self.persist_turn(turn_index, Role::User, prompt.to_string());

        self.phase = ChatPhase::Reasoning;
        self.emit(ChatEvent::Reasoning);

        let (reply, fallback) = match self.backend.chat(&transcript).await {
            Ok(reply) if !reply.trim().is_empty() => (reply.trim().to_string(), false),
            Ok(_) => (FALLBACK_REPLY.to_string(), true),
            Err(e) => {
                warn!("chat relay failed: {}", e);
                (FALLBACK_REPLY.to_string(), true)
            }
        };

        self.reveal(&reply).await;

        if !fallback {
            self.persist_turn(turn_index + 1, Role::Assistant, reply.clone());
        }

        self.phase = ChatPhase::Idle;
        self.emit(ChatEvent::Completed { reply, fallback });
        Ok(())
    }

    /// Grow the last transcript turn chunk by chunk.
    async fn reveal(&mut self, reply: &str) {
        self.phase = ChatPhase::Typing;

        {
            let mut store = self.store.lock().expect("store lock poisoned");
            store.update(|doc| {
                doc.chat.turns.push(ChatTurn {
                    role: Role::Assistant,
                    content: String::new(),
                    ts: unix_millis(),
                });
            });
        }

        let chars: Vec<char> = reply.chars().collect();
        let mut shown = String::new();
        for chunk in chars.chunks(REVEAL_CHUNK_CHARS) {
            shown.extend(chunk.iter());
            {
                let mut store = self.store.lock().expect("store lock poisoned");
                let current = shown.clone();
                store.update(|doc| {
                    if let Some(last) = doc.chat.turns.last_mut() {
                        last.content = current;
                    }
                });
            }
            self.emit(ChatEvent::Typing(shown.clone()));
            tokio::time::sleep(REVEAL_INTERVAL).await;
        }

        // Reply length counts toward usage even for the fallback text.
        let reply_chars = chars.len();
        let mut store = self.store.lock().expect("store lock poisoned");
        store.update(|doc| doc.chat.stats.total_reply_chars += reply_chars);
    }

    /// Append a turn to the durable chat log in the background. Skipped
    /// when there is no participant, the content is empty, or the
    /// content is the unavailability fallback.
    fn persist_turn(&mut self, turn_index: usize, role: Role, content: String) {
        let content = content.trim().to_string();
        if content.is_empty() {
            return;
        }
        if role == Role::Assistant && content.contains(FALLBACK_MARKER) {
            return;
        }
        let Some(participant_id) = self
            .storage
            .lock()
            .expect("storage lock poisoned")
            .get(PARTICIPANT_KEY)
        else {
            return;
        };

        let backend = self.backend.clone();
        self.pending.push(tokio::spawn(async move {
            if let Err(e) = backend
                .log_chat_turn(&participant_id, turn_index, role, &content)
                .await
            {
                warn!("chat log append failed for {}: {}", participant_id, e);
            }
        }));
    }

    /// Wait for all in-flight chat log appends to settle.
    pub async fn flush(&mut self) {
        for handle in self.pending.drain(..) {
            let _ = handle.await;
        }
    }

    fn emit(&self, event: ChatEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::storage::MemoryStorage;
    use crate::store::SurveyStore;
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::sync::Mutex;

    struct ScriptedBackend {
        reply: Result<String, u16>,
        logged: Mutex<Vec<(usize, Role, String)>>,
    }

    impl ScriptedBackend {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                logged: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(502),
                logged: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BackendClient for ScriptedBackend {
        async fn create_participant(&self) -> Result<String, BackendError> {
            Ok("p1".to_string())
        }

        async fn update_survey(
            &self,
            _participant_id: &str,
            _fields: Map<String, Value>,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn complete(&self, _participant_id: &str) -> Result<u64, BackendError> {
            Ok(0)
        }

        async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, BackendError> {
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(status) => Err(BackendError::Status(*status)),
            }
        }

        async fn log_chat_turn(
            &self,
            _participant_id: &str,
            turn_index: usize,
            role: Role,
            content: &str,
        ) -> Result<(), BackendError> {
            self.logged
                .lock()
                .unwrap()
                .push((turn_index, role, content.to_string()));
            Ok(())
        }
    }

    fn session(backend: Arc<ScriptedBackend>) -> ChatSession {
        let storage: SharedStorage = Arc::new(Mutex::new(MemoryStorage::new()));
        storage.lock().unwrap().set(PARTICIPANT_KEY, "p1");
        let store = SurveyStore::shared(storage.clone());
        ChatSession::new(store, storage, backend)
    }

    #[tokio::test]
    async fn test_turn_indices_interleave() {
        let backend = Arc::new(ScriptedBackend::replying("好的，我們開始吧。"));
        let mut chat = session(backend.clone());

        chat.send("幫我想一個開頭").await.unwrap();
        chat.send("再長一點").await.unwrap();
        chat.flush().await;

        let mut logged = backend.logged.lock().unwrap().clone();
        logged.sort_by_key(|(i, _, _)| *i);
        let shape: Vec<(usize, Role)> = logged.iter().map(|(i, r, _)| (*i, *r)).collect();
        assert_eq!(
            shape,
            vec![
                (0, Role::User),
                (1, Role::Assistant),
                (2, Role::User),
                (3, Role::Assistant),
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_shown_but_not_logged() {
        let backend = Arc::new(ScriptedBackend::failing());
        let mut chat = session(backend.clone());

        chat.send("哈囉").await.unwrap();
        chat.flush().await;

        // Transcript shows the apology to the participant.
        let store = chat.store.clone();
        let guard = store.lock().unwrap();
        let turns = &guard.document().chat.turns;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, FALLBACK_REPLY);

        // The durable log only has the user turn.
        let logged = backend.logged.lock().unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].1, Role::User);
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let backend = Arc::new(ScriptedBackend::replying("好"));
        let mut chat = session(backend.clone());

        assert!(matches!(
            chat.send("   ").await,
            Err(ChatError::EmptyPrompt)
        ));
        let store = chat.store.clone();
        assert!(store.lock().unwrap().document().chat.turns.is_empty());
    }

    #[tokio::test]
    async fn test_reveal_grows_monotonically() {
        let long_reply = "一二三四五六七八九十".repeat(5);
        let backend = Arc::new(ScriptedBackend::replying(&long_reply));
        let mut chat = session(backend);
        let mut events = chat.subscribe();

        chat.send("說個長故事").await.unwrap();

        let mut last_len = 0;
        let mut typing_steps = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                ChatEvent::Typing(shown) => {
                    assert!(shown.chars().count() > last_len);
                    assert!(long_reply.starts_with(&shown));
                    last_len = shown.chars().count();
                    typing_steps += 1;
                }
                ChatEvent::Completed { reply, fallback } => {
                    assert_eq!(reply, long_reply);
                    assert!(!fallback);
                }
                ChatEvent::Reasoning => {}
            }
        }
        assert_eq!(typing_steps, long_reply.chars().count().div_ceil(20));
    }

    #[tokio::test]
    async fn test_usage_stats_accumulate() {
        let backend = Arc::new(ScriptedBackend::replying("回覆"));
        let mut chat = session(backend);

        chat.send("第一個問題").await.unwrap();
        chat.send("第二個").await.unwrap();

        let store = chat.store.clone();
        let guard = store.lock().unwrap();
        let stats = &guard.document().chat.stats;
        assert_eq!(stats.prompt_count, 2);
        assert_eq!(stats.total_prompt_chars, 5 + 3);
        assert_eq!(stats.total_reply_chars, 4);
    }
}
