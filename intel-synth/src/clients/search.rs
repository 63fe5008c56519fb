//! Search-augmented completion client
//!
//! Speaks the Perplexity-style chat API: the OpenAI body shape plus a
//! `web_search_options.search_context_size` hint.
//!
//! # API Reference
//! - Endpoint: `POST {base_url}/chat/completions`
//! - Auth: bearer token

use super::{
    build_http_client, build_rate_limiter, post_chat, ChatCompletion, ClientError, SearchClient,
    SearchRequest,
};
use async_trait::async_trait;
use governor::DefaultDirectRateLimiter;
use intel_common::config::SearchConfig;
use serde_json::json;
use tracing::debug;

pub struct PerplexitySearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
    rate_limiter: DefaultDirectRateLimiter,
}

impl PerplexitySearchClient {
    pub fn new(config: &SearchConfig, api_key: String) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http_client(config.timeout_secs)?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            rate_limiter: build_rate_limiter(config.requests_per_second),
        })
    }

    fn request_body(&self, request: &SearchRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "web_search_options": {
                "search_context_size": request.search_context.as_str(),
            },
        })
    }
}

#[async_trait]
impl SearchClient for PerplexitySearchClient {
    async fn search(&self, request: SearchRequest) -> Result<ChatCompletion, ClientError> {
        // Rate limit API calls
        self.rate_limiter.until_ready().await;

        debug!(
            model = %self.model,
            context = request.search_context.as_str(),
            "Sending search request"
        );

        let body = self.request_body(&request);
        post_chat(
            &self.http,
            &self.endpoint,
            &self.api_key,
            &body,
            &self.model,
            self.timeout_secs,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ChatMessage;
    use crate::types::SearchContext;

    #[test]
    fn test_body_carries_context_size() {
        let client =
            PerplexitySearchClient::new(&SearchConfig::default(), "key".to_string()).unwrap();
        let body = client.request_body(&SearchRequest {
            messages: vec![ChatMessage::user("what changed in tokio")],
            search_context: SearchContext::High,
            temperature: 0.2,
            max_tokens: 800,
        });

        assert_eq!(body["model"], "sonar");
        assert_eq!(body["web_search_options"]["search_context_size"], "high");
        assert_eq!(body["messages"][0]["role"], "user");
    }
}
