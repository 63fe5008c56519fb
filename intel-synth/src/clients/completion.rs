//! OpenAI-compatible chat completion client
//!
//! # API Reference
//! - Endpoint: `POST {base_url}/chat/completions`
//! - Auth: bearer token
//! - Body: `{model, messages, temperature, max_tokens}`

use super::{
    build_http_client, build_rate_limiter, post_chat, ChatCompletion, ChatRequest, ClientError,
    CompletionClient,
};
use async_trait::async_trait;
use governor::DefaultDirectRateLimiter;
use intel_common::config::CompletionConfig;
use serde_json::json;
use tracing::debug;

/// Plain completion client used for extraction and rendering
pub struct OpenAiCompletionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
    rate_limiter: DefaultDirectRateLimiter,
}

impl OpenAiCompletionClient {
    pub fn new(config: &CompletionConfig, api_key: String) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http_client(config.timeout_secs)?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            timeout_secs: config.timeout_secs,
            rate_limiter: build_rate_limiter(config.requests_per_second),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ClientError> {
        self.rate_limiter.until_ready().await;

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "Sending completion request"
        );

        let body = json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        post_chat(
            &self.http,
            &self.endpoint,
            &self.api_key,
            &body,
            &request.model,
            self.timeout_secs,
        )
        .await
    }
}
