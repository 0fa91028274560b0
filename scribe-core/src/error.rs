//! Error types for the client-side survey engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to create participant: {0}")]
    ParticipantCreation(String),
}

#[derive(Debug, Error)]
pub enum ChatError {
    /// A previous prompt is still being answered or revealed.
    #[error("a chat request is already in progress")]
    Busy,
    #[error("prompt is empty")]
    EmptyPrompt,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("participant not found")]
    ParticipantNotFound,
    #[error("backend returned status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed backend response: {0}")]
    Malformed(String),
}
