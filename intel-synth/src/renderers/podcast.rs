//! Two-host podcast
//!
//! Generates a dialogue script through the long-form cascade, then hands it
//! to the speech service. Both credentials are checked before the first call
//! so a missing speech key never costs a completion request.

use super::{corpus_section, generate, word_count, ModelCascade, RenderError};
use crate::clients::{ChatMessage, CompletionClient, DialogueRequest, Services, SpeechClient};
use crate::config::ModelSettings;
use crate::pipeline::Aggregate;
use crate::types::TokenUsage;
use base64::Engine;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub const DEFAULT_WORD_COUNT: u32 = 300;
pub const MIN_WORD_COUNT: u32 = 100;
pub const MAX_WORD_COUNT: u32 = 2000;

pub const DEFAULT_HOST_ROLES: [&str; 2] = ["Analyst", "Commentator"];

pub const PODCAST_SEGMENTS: [&str; 5] = ["Opening", "Brief", "Analysis", "Takeaways", "Conclusion"];

/// Caller-tunable podcast options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastOptions {
    #[serde(default)]
    pub word_count: Option<u32>,
    #[serde(default)]
    pub host_roles: Option<[String; 2]>,
    #[serde(default)]
    pub style_tags: Vec<String>,
}

impl PodcastOptions {
    pub fn target_words(&self) -> u32 {
        self.word_count
            .unwrap_or(DEFAULT_WORD_COUNT)
            .clamp(MIN_WORD_COUNT, MAX_WORD_COUNT)
    }

    /// Host labels; blank overrides fall back to the defaults
    pub fn roles(&self) -> Vec<String> {
        match &self.host_roles {
            Some([a, b]) if !a.trim().is_empty() && !b.trim().is_empty() => {
                vec![a.trim().to_string(), b.trim().to_string()]
            }
            _ => DEFAULT_HOST_ROLES.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastArtifact {
    #[serde(serialize_with = "as_base64")]
    pub audio: Vec<u8>,
    pub audio_format: String,
    /// What the speech service actually spoke
    pub transcript: String,
    pub script: String,
    pub word_count: usize,
    pub model: String,
    pub render_duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub attempts: usize,
}

fn as_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

pub struct PodcastRenderer {
    completion: Option<Arc<dyn CompletionClient>>,
    speech: Option<Arc<dyn SpeechClient>>,
    cascade: ModelCascade,
}

impl PodcastRenderer {
    pub fn new(services: &Services, models: &ModelSettings) -> Self {
        Self {
            completion: services.completion.clone(),
            speech: services.speech.clone(),
            cascade: ModelCascade::new(&models.long_form, 0.8, 3000),
        }
    }

    pub async fn render(
        &self,
        aggregate: &Aggregate,
        options: &PodcastOptions,
    ) -> Result<PodcastArtifact, RenderError> {
        let completion = self
            .completion
            .as_ref()
            .ok_or(RenderError::MissingCredential("Completion service"))?;
        let speech = self
            .speech
            .as_ref()
            .ok_or(RenderError::MissingCredential("Speech service"))?;

        if aggregate.is_empty() {
            return Err(RenderError::EmptyInput);
        }

        let started = Instant::now();
        let target_words = options.target_words();
        let roles = options.roles();

        let messages = vec![
            ChatMessage::system(system_prompt(target_words, &roles, &options.style_tags)),
            ChatMessage::user(corpus_section(aggregate)),
        ];

        let generated = generate(&**completion, &self.cascade, &messages, "podcast").await?;
        if generated.placeholder {
            // No script means nothing to voice
            return Err(RenderError::MalformedUpstreamResponse(
                "completion service returned no podcast script".to_string(),
            ));
        }
        let script = generated.content;

        let spoken = speech
            .synthesize(DialogueRequest {
                text: script.clone(),
                roles: roles.clone(),
                word_count: target_words,
                style_tags: options.style_tags.clone(),
            })
            .await
            .map_err(|e| RenderError::UpstreamFailure(format!("speech synthesis failed: {}", e)))?;

        let transcript = if spoken.transcript.trim().is_empty() {
            warn!("Speech service returned no transcript, using script");
            script.clone()
        } else {
            spoken.transcript
        };

        let artifact = PodcastArtifact {
            audio: spoken.audio,
            audio_format: spoken.format,
            word_count: word_count(&transcript),
            transcript,
            script,
            model: generated.model,
            render_duration_ms: started.elapsed().as_millis() as u64,
            token_usage: generated.usage,
            attempts: generated.attempts,
        };

        info!(
            renderer = "podcast",
            model = %artifact.model,
            words = artifact.word_count,
            audio_bytes = artifact.audio.len(),
            duration_ms = artifact.render_duration_ms,
            "Render complete"
        );

        Ok(artifact)
    }
}

fn system_prompt(target_words: u32, roles: &[String], style_tags: &[String]) -> String {
    let segments = PODCAST_SEGMENTS.join(" → ");
    let style = if style_tags.is_empty() {
        String::new()
    } else {
        format!("\nDelivery style: {}.", style_tags.join(", "))
    };

    format!(
        "Write a podcast dialogue of about {} words between two hosts, {} and {}.\n\
         Structure: {}.\n\
         Format every turn as `<Host>: <line>` on its own line, alternating naturally. \
         Only discuss what the research findings support.{}",
        target_words,
        roles.first().map(String::as_str).unwrap_or(DEFAULT_HOST_ROLES[0]),
        roles.get(1).map(String::as_str).unwrap_or(DEFAULT_HOST_ROLES[1]),
        segments,
        style
    )
}
