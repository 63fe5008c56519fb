//! External service clients
//!
//! Three collaborators sit behind traits so the pipeline can run against
//! stubs in tests:
//! - [`CompletionClient`]: plain chat completion (extraction, rendering)
//! - [`SearchClient`]: search-augmented completion (one call per query)
//! - [`SpeechClient`]: dialogue-to-audio synthesis (podcast rendering)
//!
//! A client that has no credential is simply absent from [`Services`];
//! callers check presence before any network call is attempted.

pub mod completion;
pub mod search;
pub mod speech;

pub use completion::OpenAiCompletionClient;
pub use search::PerplexitySearchClient;
pub use speech::HttpSpeechClient;

use crate::types::{SearchContext, TokenUsage};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Client-level failure
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Required API key not configured (raised before any request)
    #[error("{0} API key not configured")]
    MissingCredential(&'static str),

    /// Connection, DNS, TLS or body read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// 2xx response whose body could not be decoded
    #[error("response decode failed: {0}")]
    Decode(String),

    /// Request exceeded its deadline
    #[error("request timed out after {0}s")]
    Timeout(u64),
}

impl ClientError {
    /// Failures worth retrying against another model
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Status { .. } | ClientError::Timeout(_)
        )
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(timeout_secs)
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

// ============================================================================
// Chat completion types
// ============================================================================

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Plain completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Search-augmented completion request
///
/// The search model is a property of the client, not the request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub messages: Vec<ChatMessage>,
    pub search_context: SearchContext,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Decoded completion response
///
/// `content` is `None` when the service answered 2xx but carried no
/// `choices[0].message.content`. Callers decide how to degrade.
#[derive(Debug, Clone, Default)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<TokenUsage>,
    pub model: String,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ClientError>;
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, request: SearchRequest) -> Result<ChatCompletion, ClientError>;
}

// ============================================================================
// Speech types
// ============================================================================

/// Structured dialogue handed to the speech service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueRequest {
    /// Dialogue script with one `Role: line` per turn
    pub text: String,
    /// Speaker role labels, in speaking order
    pub roles: Vec<String>,
    pub word_count: u32,
    pub style_tags: Vec<String>,
}

/// Synthesized audio plus the transcript the service actually spoke
#[derive(Debug, Clone, Default)]
pub struct SpeechOutput {
    pub audio: Vec<u8>,
    pub format: String,
    pub transcript: String,
}

#[async_trait]
pub trait SpeechClient: Send + Sync {
    async fn synthesize(&self, request: DialogueRequest) -> Result<SpeechOutput, ClientError>;
}

// ============================================================================
// Service registry
// ============================================================================

/// Configured external collaborators
///
/// Shared read-only across requests. `None` means the credential for that
/// service was not configured.
#[derive(Clone, Default)]
pub struct Services {
    pub completion: Option<Arc<dyn CompletionClient>>,
    pub search: Option<Arc<dyn SearchClient>>,
    pub speech: Option<Arc<dyn SpeechClient>>,
}

impl Services {
    pub fn completion(&self) -> Result<Arc<dyn CompletionClient>, ClientError> {
        self.completion
            .clone()
            .ok_or(ClientError::MissingCredential("Completion service"))
    }

    pub fn search(&self) -> Result<Arc<dyn SearchClient>, ClientError> {
        self.search
            .clone()
            .ok_or(ClientError::MissingCredential("Search service"))
    }

    pub fn speech(&self) -> Result<Arc<dyn SpeechClient>, ClientError> {
        self.speech
            .clone()
            .ok_or(ClientError::MissingCredential("Speech service"))
    }
}

// ============================================================================
// Shared HTTP plumbing
// ============================================================================

pub(crate) fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn build_rate_limiter(requests_per_second: u32) -> DefaultDirectRateLimiter {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(rate))
}

#[derive(Debug, Deserialize)]
struct WireChatResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    #[serde(default)]
    message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: Option<u32>,
}

/// POST an OpenAI-shaped chat body and decode the first choice
pub(crate) async fn post_chat(
    http: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &serde_json::Value,
    requested_model: &str,
    timeout_secs: u64,
) -> Result<ChatCompletion, ClientError> {
    let response = http
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| ClientError::from_reqwest(e, timeout_secs))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let text = response
        .text()
        .await
        .map_err(|e| ClientError::from_reqwest(e, timeout_secs))?;

    decode_chat_response(&text, requested_model)
}

/// Decode a chat completion body
///
/// A body that is not JSON at all is a decode error; valid JSON without
/// usable content yields `content: None`.
pub(crate) fn decode_chat_response(
    text: &str,
    requested_model: &str,
) -> Result<ChatCompletion, ClientError> {
    let wire: WireChatResponse =
        serde_json::from_str(text).map_err(|e| ClientError::Decode(e.to_string()))?;

    let content = wire
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty());

    let usage = wire.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u
            .total_tokens
            .unwrap_or(u.prompt_tokens.saturating_add(u.completion_tokens)),
    });

    debug!(
        model = requested_model,
        has_content = content.is_some(),
        "Decoded chat completion"
    );

    Ok(ChatCompletion {
        content,
        usage,
        model: wire.model.unwrap_or_else(|| requested_model.to_string()),
    })
}
