//! The survey state document.
//!
//! One document accumulates everything a participant enters across the
//! nine stages. It is serialized to session storage after every mutation
//! so a reload restores the run in place.

use llm::api::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Everything a participant has entered so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyDocument {
    /// Likert answers keyed by item id, values 1..=7.
    #[serde(default)]
    pub likert: BTreeMap<String, u8>,
    #[serde(default)]
    pub writing: Writing,
    #[serde(default)]
    pub chat: ChatTranscript,
    #[serde(default)]
    pub telemetry: Vec<TelemetryEvent>,
    #[serde(default)]
    pub authorship: Authorship,
    #[serde(default)]
    pub demographics: Demographics,
}

/// State of the timed writing task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Writing {
    #[serde(default)]
    pub story_text: String,
    pub started_at: Option<i64>,
    pub submitted_at: Option<i64>,
    pub sentence_count: Option<usize>,
    pub word_count: Option<usize>,
    /// Accumulated foreground time on the task page, in milliseconds.
    #[serde(default)]
    pub elapsed_ms: u64,
}

/// Live chat transcript plus usage counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatTranscript {
    #[serde(default)]
    pub turns: Vec<ChatTurn>,
    #[serde(default)]
    pub stats: ChatStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub ts: i64,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            ts: unix_millis(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            ts: unix_millis(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatStats {
    #[serde(default)]
    pub prompt_count: usize,
    #[serde(default)]
    pub total_prompt_chars: usize,
    #[serde(default)]
    pub total_reply_chars: usize,
}

/// A timestamped behavioral event (focus changes, paste attempts, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub kind: String,
    pub ts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl TelemetryEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ts: unix_millis(),
            meta: None,
        }
    }

    pub fn with_meta(kind: impl Into<String>, meta: Value) -> Self {
        Self {
            kind: kind.into(),
            ts: unix_millis(),
            meta: Some(meta),
        }
    }
}

/// The authorship attribution choice (option index 1..=7) and free-text
/// rationale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Authorship {
    pub value: Option<u8>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default)]
    pub age_group: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub education_level: String,
    #[serde(default)]
    pub email: String,
    /// Must be explicitly answered; `None` blocks completion.
    pub follow_up_consent: Option<bool>,
    #[serde(default)]
    pub additional_comments: String,
}
