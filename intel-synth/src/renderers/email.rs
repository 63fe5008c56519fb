//! Email digest
//!
//! Output always carries a `Subject:` line; when the model omits one a
//! default subject is prepended.

use super::{
    clamp_words, corpus_section, render_text, word_count, ModelCascade, RenderError, TextArtifact,
};
use crate::clients::{ChatMessage, CompletionClient, Services};
use crate::config::ModelSettings;
use crate::pipeline::Aggregate;
use std::sync::Arc;

/// Hard word cap for the email body
pub const EMAIL_WORD_BUDGET: usize = 500;

pub const DEFAULT_RECIPIENT: &str = "there";

const DEFAULT_SUBJECT: &str = "Subject: Your latest intelligence digest";

pub struct EmailRenderer {
    client: Option<Arc<dyn CompletionClient>>,
    cascade: ModelCascade,
}

impl EmailRenderer {
    pub fn new(services: &Services, models: &ModelSettings) -> Self {
        Self {
            client: services.completion.clone(),
            cascade: ModelCascade::single(models.render.clone(), 0.6, 1000),
        }
    }

    pub async fn render(
        &self,
        aggregate: &Aggregate,
        recipient: &str,
    ) -> Result<TextArtifact, RenderError> {
        let recipient = match recipient.trim() {
            "" => DEFAULT_RECIPIENT,
            name => name,
        };

        let messages = vec![
            ChatMessage::system(system_prompt(recipient)),
            ChatMessage::user(corpus_section(aggregate)),
        ];

        render_text(self.client.as_ref(), &self.cascade, messages, "email", |text| {
            ensure_subject_line(&text, EMAIL_WORD_BUDGET)
        })
        .await
    }
}

fn system_prompt(recipient: &str) -> String {
    format!(
        "Write an email digest of at most {} words addressed to {}.\n\
         The first line must be the subject, formatted as `Subject: <subject>`.\n\
         Then greet the recipient by name and organize the body under short headings \
         covering the most important new developments. Close with a one-line sign-off.",
        EMAIL_WORD_BUDGET, recipient
    )
}

pub fn has_subject_line(text: &str) -> bool {
    text.lines().any(|line| {
        line.trim_start()
            .get(..8)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("subject:"))
    })
}

/// Clamp to `budget` words with a subject line included in the count
fn ensure_subject_line(text: &str, budget: usize) -> String {
    let clamped = clamp_words(text, budget);
    if has_subject_line(&clamped) {
        return clamped;
    }

    let body_budget = budget.saturating_sub(word_count(DEFAULT_SUBJECT));
    format!("{}\n\n{}", DEFAULT_SUBJECT, clamp_words(&clamped, body_budget))
}
