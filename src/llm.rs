//! Chat-completion client used to write wine pairing summaries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Sampling temperature for every pairing request.
pub const PAIRING_TEMPERATURE: f32 = 0.7;

// ---

#[derive(Debug, Error)]
pub enum ModelError {
    // ---
    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model call timed out")]
    Timeout,

    #[error("model request failed: {0}")]
    Transport(String),

    #[error("model returned no answer")]
    EmptyAnswer,
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ModelError::Timeout
        } else {
            ModelError::Transport(e.to_string())
        }
    }
}

/// A hosted model that answers a single user prompt.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatModel: Send + Sync + 'static {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AnswerMessage,
}

#[derive(Debug, Deserialize)]
struct AnswerMessage {
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiChat {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        // ---
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        // ---
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: PAIRING_TEMPERATURE,
        };

        tracing::debug!("Calling {} for wine recommendation", self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let answer: ChatResponse = response.json().await?;
        answer
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ModelError::EmptyAnswer)
    }
}
