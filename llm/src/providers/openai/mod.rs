//! OpenAI-compatible chat-completion provider.
//!
//! The upstream request carries a hard timeout: a completion that has not
//! answered within [`REQUEST_TIMEOUT`] is aborted and reported as a failure.

pub mod api;

use crate::client::Client;
use crate::{ChatMessage, ChatModel, ChatRequest};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Duration;

use api::{ChatCompletionRequest, ChatCompletionResponse};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client,
    base_url: String,
}

impl OpenAIProvider {
    pub fn default(api_key: &str) -> Self {
        Self::new("https://api.openai.com/v1", api_key)
    }

    pub fn new(base_url: &str, api_key: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .expect("Invalid API key format"),
        );

        OpenAIProvider {
            client: Client::with_headers_and_timeout(headers, REQUEST_TIMEOUT),
            base_url: base_url.to_string(),
        }
    }

    pub fn create_chat_model(&self, model_name: &str) -> OpenAIChatModel {
        OpenAIChatModel {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model: model_name.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct OpenAIChatModel {
    client: Client,
    base_url: String,
    model: String,
}

impl OpenAIChatModel {
    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatMessage> {
        let body = ChatCompletionRequest::from_request(self.model.clone(), request);
        let response: ChatCompletionResponse = self.client.post(self.chat_url(), &body).await?;
        Ok(response.into())
    }

    fn name(&self) -> &str {
        &self.model
    }
}
