//! Long-form detailed report
//!
//! Uses the long-form model cascade: the most capable model first, cheaper
//! models on upstream failure.

use super::{corpus_section, render_text, ModelCascade, RenderError, TextArtifact};
use crate::clients::{ChatMessage, CompletionClient, Services};
use crate::config::ModelSettings;
use crate::pipeline::Aggregate;
use std::sync::Arc;

pub const REPORT_TARGET_WORDS: (usize, usize) = (1500, 2000);

pub const REPORT_SECTIONS: [&str; 5] = [
    "Executive Summary",
    "Detailed Analysis",
    "Strategic Implications",
    "Recommendations",
    "Bibliography",
];

pub struct ReportRenderer {
    client: Option<Arc<dyn CompletionClient>>,
    cascade: ModelCascade,
}

impl ReportRenderer {
    pub fn new(services: &Services, models: &ModelSettings) -> Self {
        Self {
            client: services.completion.clone(),
            cascade: ModelCascade::new(&models.long_form, 0.7, 4000),
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

        render_text(self.client.as_ref(), &self.cascade, messages, "report", |text| {
            text.trim().to_string()
        })
        .await
    }
}

fn system_prompt(report_style: &str) -> String {
    let outline = REPORT_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Write a detailed intelligence report of {} to {} words in a {} style.\n\
         Follow this outline exactly, one markdown heading per section:\n{}\n\
         Ground every claim in the research findings. The Bibliography lists every source \
         cited in the findings.",
        REPORT_TARGET_WORDS.0, REPORT_TARGET_WORDS.1, report_style, outline
    )
}
