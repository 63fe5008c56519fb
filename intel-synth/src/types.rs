//! Core pipeline data types
//!
//! Every value here is owned by a single pipeline invocation. Wire names are
//! camelCase to match the HTTP surface.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

// ============================================================================
// Query
// ============================================================================

/// A structured search intent derived from a transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Search text sent to the search service
    #[serde(rename = "query")]
    pub text: String,
    /// Why this search matters to the user
    pub intent: String,
}

impl Query {
    pub fn new(text: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent: intent.into(),
        }
    }
}

// ============================================================================
// Token accounting
// ============================================================================

/// Token counts reported by a completion call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(rhs.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(rhs.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(rhs.total_tokens);
    }
}

impl AddAssign<&Option<TokenUsage>> for TokenUsage {
    fn add_assign(&mut self, rhs: &Option<TokenUsage>) {
        if let Some(usage) = rhs {
            *self += *usage;
        }
    }
}

// ============================================================================
// Search outcome
// ============================================================================

/// Per-query result of one isolated search task
///
/// Exactly one outcome exists per submitted query. A failed search keeps its
/// slot with `success == false`, an empty `response` and an `error` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub query: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    /// Successful search with its response text
    pub fn succeeded(
        query: &Query,
        response: String,
        token_usage: Option<TokenUsage>,
        duration_ms: u64,
    ) -> Self {
        Self {
            query: query.text.clone(),
            intent: query.intent.clone(),
            response,
            token_usage,
            duration_ms,
            success: true,
            error: None,
        }
    }

    /// Failed search; the response is always empty
    pub fn failed(query: &Query, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            query: query.text.clone(),
            intent: query.intent.clone(),
            response: String::new(),
            token_usage: None,
            duration_ms,
            success: false,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// Pipeline settings
// ============================================================================

/// How much retrieved context the search service should pull in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchContext {
    Low,
    #[default]
    Medium,
    High,
}

impl SearchContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchContext::Low => "low",
            SearchContext::Medium => "medium",
            SearchContext::High => "high",
        }
    }
}

/// Caller-supplied settings, echoed back unmodified in the response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    #[serde(default = "default_timeframe")]
    pub search_timeframe: String,
    #[serde(default = "default_query_count")]
    pub query_count: usize,
    #[serde(default)]
    pub search_context: SearchContext,
    #[serde(default = "default_report_style")]
    pub report_style: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            search_timeframe: default_timeframe(),
            query_count: default_query_count(),
            search_context: SearchContext::default(),
            report_style: default_report_style(),
        }
    }
}

fn default_timeframe() -> String {
    "week".to_string()
}

fn default_query_count() -> usize {
    8
}

pub(crate) fn default_report_style() -> String {
    "executive".to_string()
}
