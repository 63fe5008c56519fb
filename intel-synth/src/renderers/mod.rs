//! Output format renderers
//!
//! Each renderer turns an [`Aggregate`] into one artifact with its own
//! prompt contract, word budget and model policy:
//! - [`BriefRenderer`]: ≤300-word brief, single model
//! - [`EmailRenderer`]: ≤500-word email digest with subject line, single model
//! - [`ReportRenderer`]: long-form report, model cascade
//! - [`PodcastRenderer`]: two-host dialogue audio, model cascade + speech
//!
//! Renderers are independent: any one can run without the others, any
//! number of times against the same aggregate, and none of them touches
//! extraction or search.

pub mod brief;
pub mod cascade;
pub mod email;
pub mod podcast;
pub mod report;

pub use brief::BriefRenderer;
pub use cascade::{CascadeFailure, CascadeOutcome, ModelAttempt, ModelCascade};
pub use email::EmailRenderer;
pub use podcast::{PodcastArtifact, PodcastOptions, PodcastRenderer};
pub use report::ReportRenderer;

use crate::clients::{ChatMessage, ClientError, CompletionClient};
use crate::pipeline::Aggregate;
use crate::types::TokenUsage;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

/// Substituted when the completion service answers without content
pub const PLACEHOLDER_CONTENT: &str = "[No content returned by the completion service]";

#[derive(Debug, Error)]
pub enum RenderError {
    /// Required API key absent; no call was attempted
    #[error("{0} API key not configured")]
    MissingCredential(&'static str),

    /// Nothing to render from
    #[error("no usable input: none of the searches succeeded")]
    EmptyInput,

    /// Completion or audio call failed after any fallback
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// 2xx without the expected payload
    #[error("malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),
}

impl From<ClientError> for RenderError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::MissingCredential(service) => RenderError::MissingCredential(service),
            ClientError::Decode(msg) => RenderError::MalformedUpstreamResponse(msg),
            other => RenderError::UpstreamFailure(other.to_string()),
        }
    }
}

/// Rendered text artifact
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextArtifact {
    pub content: String,
    pub word_count: usize,
    pub model: String,
    pub render_duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    /// Model attempts made by the cascade
    pub attempts: usize,
    /// True when `content` is the placeholder
    pub placeholder: bool,
}

/// Generated text before post-processing
pub(crate) struct Generated {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
    pub attempts: usize,
    pub placeholder: bool,
}

/// Run a cascade and apply the placeholder policy
///
/// Missing content and undecodable 2xx bodies become the placeholder;
/// every other failure propagates. The placeholder keeps the model,
/// attempt count and usage of the attempt that produced it.
pub(crate) async fn generate(
    client: &dyn CompletionClient,
    cascade: &ModelCascade,
    messages: &[ChatMessage],
    renderer: &'static str,
) -> Result<Generated, RenderError> {
    let (model, attempts, usage, reason) = match cascade.run(client, messages).await {
        Ok(outcome) => match outcome.completion.content {
            Some(content) => {
                return Ok(Generated {
                    content,
                    model: outcome.model,
                    usage: outcome.completion.usage,
                    attempts: outcome.attempts,
                    placeholder: false,
                })
            }
            None => {
                let reason = format!("{} returned no choices[0].message.content", outcome.model);
                (outcome.model, outcome.attempts, outcome.completion.usage, reason)
            }
        },
        Err(CascadeFailure {
            error: ClientError::Decode(reason),
            model,
            attempts,
        }) => (model, attempts, None, reason),
        Err(failure) => return Err(RenderError::from(failure.error)),
    };

    warn!(renderer, model = %model, attempts, reason = %reason, "Substituting placeholder content");
    Ok(Generated {
        content: PLACEHOLDER_CONTENT.to_string(),
        model,
        usage,
        attempts,
        placeholder: true,
    })
}

/// Shared text rendering path for brief, email and report
pub(crate) async fn render_text(
    client: Option<&Arc<dyn CompletionClient>>,
    cascade: &ModelCascade,
    messages: Vec<ChatMessage>,
    renderer: &'static str,
    finish: impl FnOnce(String) -> String,
) -> Result<TextArtifact, RenderError> {
    let client = client.ok_or(RenderError::MissingCredential("Completion service"))?;
    let started = Instant::now();

    let generated = generate(&**client, cascade, &messages, renderer).await?;
    let content = if generated.placeholder {
        generated.content
    } else {
        finish(generated.content)
    };

    let artifact = TextArtifact {
        word_count: word_count(&content),
        content,
        model: generated.model,
        render_duration_ms: started.elapsed().as_millis() as u64,
        token_usage: generated.usage,
        attempts: generated.attempts,
        placeholder: generated.placeholder,
    };

    info!(
        renderer,
        model = %artifact.model,
        words = artifact.word_count,
        duration_ms = artifact.render_duration_ms,
        "Render complete"
    );

    Ok(artifact)
}

/// Research corpus as it appears in prompts
pub(crate) fn corpus_section(aggregate: &Aggregate) -> String {
    if aggregate.is_empty() {
        "No search results were available. Say so plainly and keep the output short.".to_string()
    } else {
        format!(
            "Research findings ({} of {} searches succeeded):\n\n{}",
            aggregate.len(),
            aggregate.total(),
            aggregate.corpus()
        )
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Cut `text` after `max_words` words, keeping its line structure
pub fn clamp_words(text: &str, max_words: usize) -> String {
    let mut words = 0usize;
    let mut in_word = false;

    for (index, ch) in text.char_indices() {
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            in_word = true;
            words += 1;
            if words > max_words {
                return text[..index].trim_end().to_string();
            }
        }
    }

    text.trim_end().to_string()
}
