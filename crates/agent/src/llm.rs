use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tablesafe_core::config::LlmConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
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

/// Opaque candidate-response producer. The guardrail pipeline never
/// inspects anything beyond the returned string.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, system_prompt: &str, history: &[ChatTurn]) -> Result<String>;
}

/// Ollama `/api/chat` backend.
pub struct OllamaChatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl OllamaChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("could not build chat http client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<&'a ChatTurn>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl ChatClient for OllamaChatClient {
    async fn chat(&self, system_prompt: &str, history: &[ChatTurn]) -> Result<String> {
        let system = ChatTurn::system(system_prompt);
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(&system);
        messages.extend(history);

        let url = format!("{}/api/chat", self.base_url);
        let mut request = self
            .http
            .post(&url)
            .json(&ChatRequest { model: &self.model, messages, stream: false });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("chat request to {url} failed"))?
            .error_for_status()
            .context("chat backend returned an error status")?;

        let parsed: ChatResponse =
            response.json().await.context("chat response was not valid JSON")?;
        if parsed.message.content.trim().is_empty() {
            bail!("chat backend returned an empty message");
        }
        Ok(parsed.message.content)
    }
}
