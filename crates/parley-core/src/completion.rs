use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::message::{Message, Role};

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-r1-0528:free";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Where and how to reach the chat-completion endpoint
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Sent as `HTTP-Referer`
    pub referer: String,
    /// Sent as `X-Title`
    pub title: String,
    pub timeout: Duration,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            referer: "https://github.com/parley-chat/parley".to_string(),
            title: "Parley".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("completion response was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    /// The request task panicked or was cancelled before producing a result
    #[error("completion task ended abnormally: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// A message as it travels over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role(),
            content: message.content().to_string(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
    }
}

/// Anything that can answer a conversation history with a reply.
///
/// `Ok(None)` means the service answered but the reply carried no text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, messages: &[WireMessage]) -> Result<Option<String>, CompletionError>;
}

#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    settings: CompletionSettings,
}

impl CompletionClient {
    pub fn new(settings: CompletionSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl CompletionService for CompletionClient {
    async fn complete(&self, messages: &[WireMessage]) -> Result<Option<String>, CompletionError> {
        let request = CompletionRequest {
            model: &self.settings.model,
            messages,
        };

        let mut builder = self
            .client
            .post(&self.settings.endpoint)
            .header("HTTP-Referer", &self.settings.referer)
            .header("X-Title", &self.settings.title)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(api_key) = &self.settings.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let completion: CompletionResponse = serde_json::from_slice(&bytes)?;
        Ok(completion.into_content())
    }
}
