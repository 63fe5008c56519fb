//! Model fallback cascade
//!
//! An ordered list of model attempts tried in sequence. A retryable failure
//! (transport, non-2xx, timeout) on any attempt but the last moves on to the
//! next model; the last failure is returned. Non-retryable failures return
//! immediately.

use crate::clients::{ChatCompletion, ChatMessage, ChatRequest, ClientError, CompletionClient};
use tracing::{debug, warn};

/// One model attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAttempt {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Successful cascade result
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    pub completion: ChatCompletion,
    /// Model that produced the completion
    pub model: String,
    /// Attempts made, including the successful one
    pub attempts: usize,
}

/// Failed cascade: the error that ended it and the attempt it ended on
#[derive(Debug, Clone)]
pub struct CascadeFailure {
    pub error: ClientError,
    /// Model of the final attempt, empty when there were no attempts
    pub model: String,
    pub attempts: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelCascade {
    attempts: Vec<ModelAttempt>,
}

impl ModelCascade {
    /// Same parameters across every model
    pub fn new(models: &[String], temperature: f32, max_tokens: u32) -> Self {
        Self {
            attempts: models
                .iter()
                .map(|model| ModelAttempt {
                    model: model.clone(),
                    temperature,
                    max_tokens,
                })
                .collect(),
        }
    }

    pub fn single(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            attempts: vec![ModelAttempt {
                model: model.into(),
                temperature,
                max_tokens,
            }],
        }
    }

    pub fn attempts(&self) -> &[ModelAttempt] {
        &self.attempts
    }

    pub async fn run(
        &self,
        client: &dyn CompletionClient,
        messages: &[ChatMessage],
    ) -> Result<CascadeOutcome, CascadeFailure> {
        let mut last_failure = CascadeFailure {
            error: ClientError::Transport("model cascade has no attempts".to_string()),
            model: String::new(),
            attempts: 0,
        };

        for (index, attempt) in self.attempts.iter().enumerate() {
            let is_last = index + 1 == self.attempts.len();
            debug!(model = %attempt.model, attempt = index + 1, "Cascade attempt");

            let request = ChatRequest {
                model: attempt.model.clone(),
                messages: messages.to_vec(),
                temperature: attempt.temperature,
                max_tokens: attempt.max_tokens,
            };

            match client.complete(request).await {
                Ok(completion) => {
                    return Ok(CascadeOutcome {
                        completion,
                        model: attempt.model.clone(),
                        attempts: index + 1,
                    });
                }
                Err(e) if e.is_retryable() && !is_last => {
                    warn!(
                        model = %attempt.model,
                        next = %self.attempts[index + 1].model,
                        error = %e,
                        "Model failed, falling back"
                    );
                    last_failure = CascadeFailure {
                        error: e,
                        model: attempt.model.clone(),
                        attempts: index + 1,
                    };
                }
                Err(e) => {
                    return Err(CascadeFailure {
                        error: e,
                        model: attempt.model.clone(),
                        attempts: index + 1,
                    })
                }
            }
        }

        Err(last_failure)
    }
}
