//! Concurrent search execution
//!
//! # Concurrency
//! Every query runs as an independent task, at most `max_concurrency` in
//! flight. Task futures are infallible: transport errors, non-2xx answers,
//! missing content, timeouts and panics are all converted into a failed
//! [`SearchOutcome`] inside the task.
//!
//! # Join
//! `execute` returns only after every task has settled. Results land in
//! per-index slots, so output order equals input order no matter which task
//! finishes first, and `outcomes.len() == queries.len()` always holds.

use crate::clients::{ChatMessage, SearchClient, SearchRequest};
use crate::types::{PipelineSettings, Query, SearchOutcome, TokenUsage};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const SEARCH_TEMPERATURE: f32 = 0.2;
const SEARCH_MAX_TOKENS: u32 = 1200;

pub struct SearchExecutor {
    client: Arc<dyn SearchClient>,
    max_concurrency: usize,
    task_timeout: Duration,
}

impl SearchExecutor {
    pub fn new(client: Arc<dyn SearchClient>, max_concurrency: usize, task_timeout: Duration) -> Self {
        Self {
            client,
            max_concurrency: max_concurrency.max(1),
            task_timeout,
        }
    }

    /// Run all queries and wait for every one to settle
    pub async fn execute(
        &self,
        queries: &[Query],
        settings: &PipelineSettings,
    ) -> Vec<SearchOutcome> {
        if queries.is_empty() {
            return Vec::new();
        }

        let total = queries.len();
        let mut slots: Vec<Option<SearchOutcome>> = vec![None; total];

        let owned: Vec<(usize, Query)> = queries.iter().cloned().enumerate().collect();
        let settled: Vec<(usize, SearchOutcome)> = stream::iter(owned)
            .map(|(index, query)| async move {
                (index, self.run_isolated(index, &query, settings).await)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        for (index, outcome) in settled {
            slots[index] = Some(outcome);
        }

        let outcomes: Vec<SearchOutcome> = slots
            .into_iter()
            .zip(queries)
            .map(|(slot, query)| {
                slot.unwrap_or_else(|| SearchOutcome::failed(query, "search task did not report", 0))
            })
            .collect();

        let successful = outcomes.iter().filter(|o| o.success).count();
        info!(
            successful,
            failed = total - successful,
            total,
            "Search fan-out joined"
        );

        outcomes
    }

    /// One search task with timeout and panic isolation
    async fn run_isolated(
        &self,
        index: usize,
        query: &Query,
        settings: &PipelineSettings,
    ) -> SearchOutcome {
        let started = Instant::now();

        let guarded = AssertUnwindSafe(self.search_once(query, settings)).catch_unwind();
        let result = tokio::time::timeout(self.task_timeout, guarded).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(Ok(Ok((response, usage)))) => {
                SearchOutcome::succeeded(query, response, usage, duration_ms)
            }
            Ok(Ok(Err(message))) => SearchOutcome::failed(query, message, duration_ms),
            Ok(Err(_panic)) => SearchOutcome::failed(query, "search task panicked", duration_ms),
            Err(_elapsed) => SearchOutcome::failed(
                query,
                format!("search timed out after {}s", self.task_timeout.as_secs()),
                duration_ms,
            ),
        };

        if outcome.success {
            debug!(query_index = index, duration_ms, "Search succeeded");
        } else {
            warn!(
                query_index = index,
                query = %query.text,
                duration_ms,
                error = outcome.error.as_deref().unwrap_or_default(),
                "Search failed (isolated)"
            );
        }

        outcome
    }

    async fn search_once(
        &self,
        query: &Query,
        settings: &PipelineSettings,
    ) -> Result<(String, Option<TokenUsage>), String> {
        let request = SearchRequest {
            messages: vec![
                ChatMessage::system(SEARCH_SYSTEM_PROMPT),
                ChatMessage::user(search_prompt(query, settings)),
            ],
            search_context: settings.search_context,
            temperature: SEARCH_TEMPERATURE,
            max_tokens: SEARCH_MAX_TOKENS,
        };

        let completion = self
            .client
            .search(request)
            .await
            .map_err(|e| e.to_string())?;

        match completion.content {
            Some(content) => Ok((content, completion.usage)),
            None => Err("malformed search response: missing message content".to_string()),
        }
    }
}

const SEARCH_SYSTEM_PROMPT: &str = "You are a research assistant tracking recent developments. \
Report concrete, dated facts with their sources. Prefer the newest information available.";

fn search_prompt(query: &Query, settings: &PipelineSettings) -> String {
    format!(
        "Search for: {}\nIntent: {}\nTimeframe: focus on developments from the past {}.\n\
         Search depth: {}.\n\
         Summarize what changed, what is new, and cite sources.",
        query.text,
        query.intent,
        settings.search_timeframe,
        settings.search_context.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchContext;

    #[test]
    fn test_prompt_folds_settings() {
        let settings = PipelineSettings {
            search_timeframe: "month".to_string(),
            search_context: SearchContext::Low,
            ..PipelineSettings::default()
        };
        let prompt = search_prompt(&Query::new("tool X pricing", "watch competitors"), &settings);

        assert!(prompt.contains("tool X pricing"));
        assert!(prompt.contains("watch competitors"));
        assert!(prompt.contains("past month"));
        assert!(prompt.contains("low"));
    }
}
