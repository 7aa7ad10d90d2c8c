//! HTTP client for the model server.
//!
//! Two endpoints are used:
//! - the *completion* endpoint (a proxy in front of the model) answers a
//!   `{prompt}` body with one JSON object or `text/plain`;
//! - the *stream* endpoint (Ollama `/api/generate`) answers
//!   `{model, prompt, stream: true}` with NDJSON.
//!
//! Streaming failures fall back to a single completion request.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::stream;

/// Author of a chat message.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A generation request: the conversation plus sampling knobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Completion {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages, ..Default::default() }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Flatten a conversation into the bracketed prompt format the model proxy expects.
pub fn messages_to_prompt(messages: &[ChatMessage]) -> String {
    let blocks: Vec<String> = messages
        .iter()
        .map(|m| match m.role {
            Role::System => format!("[System Instructions]\n{}\n", m.content),
            Role::User => format!("[User]\n{}\n", m.content),
            Role::Assistant => format!("[Assistant]\n{}\n", m.content),
        })
        .collect();
    blocks.join("\n") + "\n[Assistant]\n"
}

/// Pull the answer out of a non-streaming completion body.
pub fn completion_text(body: &Value) -> Option<&str> {
    fn non_empty(v: &Value) -> Option<&str> {
        v.as_str().filter(|s| !s.is_empty())
    }
    body.get("response")
        .and_then(non_empty)
        .or_else(|| body.pointer("/message/content").and_then(non_empty))
        .or_else(|| body.pointer("/choices/0/message/content").and_then(non_empty))
}

/// Seam between the application and whatever produces text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate the whole answer in one response.
    async fn complete(&self, request: &Completion) -> Result<String, LlmError>;

    /// Generate token by token.  `on_token` receives the accumulated text
    /// after every delta; the full text is returned at the end.
    async fn complete_stream(
        &self,
        request: &Completion,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, LlmError>;
}

/// Endpoints and credentials for [`LlmClient`].
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub completion_url: String,
    pub stream_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl LlmConfig {
    /// The Ollama generate endpoint living on the same host as `completion_url`.
    ///
    /// Falls back to `http://localhost:11434/api/generate` when the URL does
    /// not parse.
    pub fn stream_url_for(completion_url: &str) -> String {
        const FALLBACK: &str = "http://localhost:11434/api/generate";
        match Url::parse(completion_url) {
            Ok(mut url) => {
                if url.set_port(Some(11434)).is_err() {
                    return FALLBACK.to_owned();
                }
                url.set_path("/api/generate");
                url.set_query(None);
                url.to_string()
            }
            Err(_) => FALLBACK.to_owned(),
        }
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct StreamBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: StreamOptions,
}

#[derive(Serialize)]
struct StreamOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// reqwest-backed [`LanguageModel`].
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .user_agent(concat!("cognify-llm/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn fallback(
        &self,
        request: &Completion,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, LlmError> {
        let text = self.complete(request).await?;
        on_token(&text);
        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, request: &Completion) -> Result<String, LlmError> {
        let prompt = messages_to_prompt(&request.messages);
        debug!(url = %self.config.completion_url, prompt_len = prompt.len(), "completion request");

        let mut builder = self.client.post(&self.config.completion_url).json(&CompletionBody {
            prompt: &prompt,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        });
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let plain = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/plain"));
        if plain {
            return Ok(response.text().await?);
        }

        let body: Value = response.json().await?;
        completion_text(&body)
            .map(str::to_owned)
            .ok_or(LlmError::UnexpectedFormat)
    }

    async fn complete_stream(
        &self,
        request: &Completion,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, LlmError> {
        let prompt = messages_to_prompt(&request.messages);
        info!(url = %self.config.stream_url, model = %self.config.model, "streaming request");

        let sent = self
            .client
            .post(&self.config.stream_url)
            .json(&StreamBody {
                model: &self.config.model,
                prompt: &prompt,
                stream: true,
                options: StreamOptions {
                    temperature: request.temperature,
                    num_predict: request.max_tokens,
                },
            })
            .send()
            .await;

        let response = match sent {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(status = r.status().as_u16(), "streaming rejected; falling back to non-streaming");
                return self.fallback(request, on_token).await;
            }
            Err(e) => {
                warn!(error = %e, "streaming failed; falling back to non-streaming");
                return self.fallback(request, on_token).await;
            }
        };

        let text = stream::accumulate(response.bytes_stream(), &mut *on_token).await?;
        debug!(len = text.len(), "stream finished");
        Ok(text)
    }
}
