//! Query extraction
//!
//! Turns a free-form transcript into structured search intents with one
//! completion call. Model output is untrusted text: decoding either yields a
//! typed query list or an explicit fallback, never a half-populated result.

use crate::clients::{ChatMessage, ChatRequest, ClientError, CompletionClient};
use crate::types::{Query, TokenUsage};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Characters of transcript kept as the fallback query text
pub const FALLBACK_QUERY_CHARS: usize = 100;

/// Intent attached to the fallback query
pub const FALLBACK_INTENT: &str = "Find related recent developments";

const EXTRACTION_TEMPERATURE: f32 = 0.3;
const EXTRACTION_MAX_TOKENS: u32 = 1000;

/// Why decoding fell back to a synthesized query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No balanced `{...}` object in the output
    NoJsonObject,
    /// Object found but not valid JSON
    InvalidJson(String),
    /// Decoded, but no entry had a non-empty `query`
    NoUsableQueries,
    /// 2xx response without message content
    EmptyResponse,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::NoJsonObject => write!(f, "no JSON object in model output"),
            FallbackReason::InvalidJson(e) => write!(f, "invalid JSON: {}", e),
            FallbackReason::NoUsableQueries => write!(f, "no usable queries in model output"),
            FallbackReason::EmptyResponse => write!(f, "model returned no content"),
        }
    }
}

/// Tagged decode result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    Decoded(T),
    Fallback(FallbackReason),
}

/// Extraction stage output
#[derive(Debug, Clone)]
pub struct Extraction {
    pub queries: Vec<Query>,
    pub used_fallback: bool,
    pub fallback_reason: Option<FallbackReason>,
    pub token_usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    #[serde(default)]
    queries: Option<Vec<RawQuery>>,
}

#[derive(Debug, Deserialize)]
struct RawQuery {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    intent: Option<String>,
}

pub struct QueryExtractor {
    client: Arc<dyn CompletionClient>,
    model: String,
}

impl QueryExtractor {
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Extract search intents from `transcript`
    ///
    /// `query_count` is a hint written into the prompt; the model may return
    /// more or fewer. Decode problems degrade to a single fallback query;
    /// only transport-level failures are returned as errors.
    pub async fn extract(
        &self,
        transcript: &str,
        query_count: usize,
    ) -> Result<Extraction, ClientError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(user_prompt(transcript, query_count)),
            ],
            temperature: EXTRACTION_TEMPERATURE,
            max_tokens: EXTRACTION_MAX_TOKENS,
        };

        let completion = self.client.complete(request).await?;

        let decoded = match completion.content.as_deref() {
            Some(text) => decode_queries(text),
            None => Decoded::Fallback(FallbackReason::EmptyResponse),
        };

        let (queries, fallback_reason) = match decoded {
            Decoded::Decoded(queries) => {
                debug!(count = queries.len(), "Extracted search queries");
                (queries, None)
            }
            Decoded::Fallback(reason) => {
                warn!(reason = %reason, "Query extraction degraded to fallback query");
                (vec![fallback_query(transcript)], Some(reason))
            }
        };

        Ok(Extraction {
            used_fallback: fallback_reason.is_some(),
            queries,
            fallback_reason,
            token_usage: completion.usage,
        })
    }
}

const SYSTEM_PROMPT: &str = "You turn conversation transcripts into web search queries. \
Focus on what is NEW: recent announcements, releases, changes, and emerging trends \
for the people, companies, products and topics the user cares about. \
Avoid general background or definitional queries. \
Respond with a single JSON object and nothing else.";

fn user_prompt(transcript: &str, query_count: usize) -> String {
    format!(
        "Transcript:\n\"\"\"\n{}\n\"\"\"\n\n\
         Generate {} search queries about recent developments the user would want to track.\n\
         Return JSON in exactly this shape:\n\
         {{\"queries\": [{{\"query\": \"<search text>\", \"intent\": \"<what the user wants to learn>\"}}]}}",
        transcript,
        query_count.max(1)
    )
}

/// Strictly decode model output into queries
pub fn decode_queries(text: &str) -> Decoded<Vec<Query>> {
    let Some(object) = find_balanced_object(text) else {
        return Decoded::Fallback(FallbackReason::NoJsonObject);
    };

    let payload: ExtractionPayload = match serde_json::from_str(object) {
        Ok(payload) => payload,
        Err(e) => return Decoded::Fallback(FallbackReason::InvalidJson(e.to_string())),
    };

    let queries: Vec<Query> = payload
        .queries
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| {
            let text = raw.query?.trim().to_string();
            if text.is_empty() {
                return None;
            }
            let intent = raw
                .intent
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .unwrap_or_else(|| FALLBACK_INTENT.to_string());
            Some(Query { text, intent })
        })
        .collect();

    if queries.is_empty() {
        Decoded::Fallback(FallbackReason::NoUsableQueries)
    } else {
        Decoded::Decoded(queries)
    }
}

/// Locate the first balanced `{...}` substring
///
/// Braces inside JSON string literals are ignored and backslash escapes are
/// honored. Returns `None` if the first object never closes.
pub fn find_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Single query synthesized from the transcript prefix
pub fn fallback_query(transcript: &str) -> Query {
    let text: String = transcript.trim().chars().take(FALLBACK_QUERY_CHARS).collect();
    Query::new(text.trim_end(), FALLBACK_INTENT)
}
