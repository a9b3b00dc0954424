//! Chat-completion gateway shared by every plugin that talks to the LLM.

use crate::log_internal;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};

/// LLM generation settings, copied out of the config so no lock is held while a request runs.
#[derive(Clone, Debug)]
pub struct LlmSettings {
    pub system: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Where and how to reach the chat endpoint.  Swappable at runtime on config reload.
#[derive(Clone, Debug)]
pub struct LlmEndpoint {
    pub chat_url: String,
    pub api_key: Option<String>,
    pub model_name: String,
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request to chat endpoint failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat endpoint returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("chat endpoint returned no choices")]
    EmptyReply,
    #[error("LLM gateway is shut down")]
    Closed,
}

#[derive(serde::Serialize)]
struct LlmChatRequest<'a> {
    /// LLM model name
    model: &'a str,
    /// Chat conversation to continue.
    messages: &'a [ChatMessage],
    /// LLM temperature
    temperature: f32,
    /// Upper bound on generated tokens
    max_tokens: u32,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: ChatMessageRole,
    pub content: String,
}

#[allow(non_camel_case_types)] // Serialized literally; case matters
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ChatMessageRole {
    system,
    user,
    assistant,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatMessageRole::system,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatMessageRole::user,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatMessageRole::assistant,
            content: content.into(),
        }
    }
}

#[derive(serde::Deserialize)]
struct LlmChatResponse {
    choices: Vec<LlmChatChoice>,
}

#[derive(serde::Deserialize)]
struct LlmChatChoice {
    message: ChatMessage,
}

/// Anything that can continue a chat.  The quiz generator only needs this, which lets tests
/// script the model's replies.
#[serenity::async_trait]
pub trait ChatBackend: Sync + Send {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, GatewayError>;
}

/// Chat-completion client with a fixed pool of concurrency permits.  Callers beyond the pool
/// size wait for a permit; failures are returned immediately without retrying.
pub struct LlmGateway {
    http: reqwest::Client,
    endpoint: RwLock<LlmEndpoint>,
    permits: Semaphore,
}

impl LlmGateway {
    pub fn new(endpoint: LlmEndpoint, max_concurrent_requests: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: RwLock::new(endpoint),
            permits: Semaphore::new(max_concurrent_requests.max(1)),
        }
    }

    pub async fn reconfigure(&self, endpoint: LlmEndpoint) {
        *self.endpoint.write().await = endpoint;
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[serenity::async_trait]
impl ChatBackend for LlmGateway {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, GatewayError> {
        if self.available_permits() == 0 {
            tracing::debug!("All LLM permits in use, waiting for one");
        }
        // Held until the reply is read.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| GatewayError::Closed)?;

        let endpoint = self.endpoint.read().await.clone();
        let request = LlmChatRequest {
            model: &endpoint.model_name,
            messages,
            temperature,
            max_tokens,
        };

        log_internal!("Sending request to chat endpoint {}... ", endpoint.chat_url);
        let mut builder = self
            .http
            .post(&endpoint.chat_url)
            .timeout(endpoint.timeout)
            .json(&request);
        if let Some(key) = &endpoint.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status, body });
        }

        let response = response.json::<LlmChatResponse>().await?;
        log_internal!(
            "Sending request to chat endpoint {}... done",
            endpoint.chat_url
        );

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(GatewayError::EmptyReply)
    }
}
