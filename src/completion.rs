// src/completion.rs
// Chat-completion client. One chunk in, the model's raw reply text out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};

/// Produces raw prompt/completion material for one chunk of text.
///
/// The orchestrator only depends on this trait; the HTTP-backed
/// implementation below is swapped out for a scripted one in tests.
#[async_trait]
pub trait PairGenerator: Send + Sync {
    async fn generate(&self, api_key: &str, chunk: &str) -> PipelineResult<String>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

/// OpenAI-compatible chat-completion client.
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    prompt: String,
}

impl OpenAiClient {
    /// `prompt` is the fully rendered system instruction (see
    /// [`crate::config::PromptTemplate`]).
    pub fn new(endpoint: String, model: String, prompt: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            model,
            prompt,
        }
    }
}

#[async_trait]
impl PairGenerator for OpenAiClient {
    async fn generate(&self, api_key: &str, chunk: &str) -> PipelineResult<String> {
        debug!(model = %self.model, chunk_chars = chunk.chars().count(), "Requesting completion");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.prompt,
                },
                ChatMessage {
                    role: "user",
                    content: chunk,
                },
            ],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Request {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| PipelineError::Request {
                status: status.as_u16(),
                body: "reply contained no completion choices".to_string(),
            })?;

        info!(reply_len = content.len(), "Completion received");
        Ok(content)
    }
}
