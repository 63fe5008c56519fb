//! Short intelligence brief

use super::{clamp_words, corpus_section, render_text, ModelCascade, RenderError, TextArtifact};
use crate::clients::{ChatMessage, CompletionClient, Services};
use crate::config::ModelSettings;
use crate::pipeline::Aggregate;
use std::sync::Arc;

/// Hard word cap for the brief
pub const BRIEF_WORD_BUDGET: usize = 300;

pub const BRIEF_SECTIONS: [&str; 4] = [
    "Key Developments",
    "Current Status",
    "Notable Changes",
    "Next Steps",
];

pub struct BriefRenderer {
    client: Option<Arc<dyn CompletionClient>>,
    cascade: ModelCascade,
}

impl BriefRenderer {
    pub fn new(services: &Services, models: &ModelSettings) -> Self {
        Self {
            client: services.completion.clone(),
            cascade: ModelCascade::single(models.render.clone(), 0.5, 700),
        }
    }

    pub async fn render(
        &self,
        aggregate: &Aggregate,
        report_style: &str,
    ) -> Result<TextArtifact, RenderError> {
        let messages = vec![
            ChatMessage::system(system_prompt(report_style)),
            ChatMessage::user(corpus_section(aggregate)),
        ];

        render_text(self.client.as_ref(), &self.cascade, messages, "brief", |text| {
            clamp_words(&text, BRIEF_WORD_BUDGET)
        })
        .await
    }
}

fn system_prompt(report_style: &str) -> String {
    let headers = BRIEF_SECTIONS
        .iter()
        .map(|s| format!("## {}", s))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Write a concise intelligence brief of at most {} words in a {} style.\n\
         Use exactly these section headers, in order:\n{}\n\
         Lead with what is new. Use short bullet points. Do not add a greeting or sign-off.",
        BRIEF_WORD_BUDGET, report_style, headers
    )
}
