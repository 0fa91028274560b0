//! Client-side core of the scribe survey application
//!
//! This crate provides:
//! - **Document**: the survey state document mirrored to session storage
//! - **Wizard**: the nine-stage step sequencer with per-stage gating
//! - **Chat**: the assistant session engine with simulated typing
//! - **Sync**: participant session, autosave and finalization against the
//!   backend HTTP surface
//! - **Storage**: `SessionStorage` trait with in-memory and file backends
pub mod autosave;
pub mod chat;
pub mod client;
pub mod content;
pub mod document;
pub mod error;
pub mod fields;
pub mod finish;
pub mod session;
pub mod storage;
pub mod store;
pub mod text;
pub mod timer;
pub mod wizard;

pub use autosave::Autosave;
pub use chat::{ChatEvent, ChatPhase, ChatSession, FALLBACK_REPLY};
pub use client::{BackendClient, HttpBackend};
pub use document::SurveyDocument;
pub use error::{BackendError, ChatError, SessionError};
pub use finish::Finalizer;
pub use session::ParticipantSession;
pub use storage::{FileStorage, MemoryStorage, SessionStorage, SharedStorage};
pub use store::{SharedStore, SurveyStore};
pub use timer::ActiveTimer;
pub use wizard::{Advance, Stage, StepWizard};
