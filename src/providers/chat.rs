//! `OpenAI` chat-completions generator

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerationRequest, Generator};
use crate::{Error, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Generates replies through the chat completions API
pub struct ChatGenerator {
    client: Client,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    base_url: String,
}

impl ChatGenerator {
    /// Create a new chat generator
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for generation".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            api_key,
            model,
            temperature: None,
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    /// Set the sampling temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Point at a different API host (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: request.persona,
                },
                Message {
                    role: "user",
                    content: request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!(model = %self.model, max_tokens = ?request.max_tokens, "requesting completion");

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "OpenAI chat API error");
            return Err(Error::Generation(format!("OpenAI API error: {status} - {body}")));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("Failed to parse OpenAI response: {e}")))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Generation("model returned an empty reply".to_string()));
        }

        tracing::info!(model = %self.model, chars = text.len(), "completion received");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "openai-chat"
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
