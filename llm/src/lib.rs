use async_trait::async_trait;

pub mod api;
mod client;
pub mod providers;
pub use api::*;

/// A chat-completion model: a full conversation in, one assistant reply out.
#[async_trait]
pub trait ChatModel {
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatMessage>;

    /// Display name of the underlying model (e.g. "gpt-4o-mini").
    fn name(&self) -> &str;
}
