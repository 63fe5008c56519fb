//! Runtime configuration for intel-synth
//!
//! Resolves API keys (ENV → TOML) and builds the external service clients.
//! A service whose key is missing is left out of [`Services`]; requests that
//! need it fail with a configuration error before any network call.

use crate::clients::{
    ClientError, HttpSpeechClient, OpenAiCompletionClient, PerplexitySearchClient, Services,
};
use intel_common::config::{resolve_secret, CompletionConfig, TomlConfig};
use std::sync::Arc;
use tracing::info;

pub const COMPLETION_KEY_ENV: &str = "INTEL_SYNTH_COMPLETION_API_KEY";
pub const SEARCH_KEY_ENV: &str = "INTEL_SYNTH_SEARCH_API_KEY";
pub const SPEECH_KEY_ENV: &str = "INTEL_SYNTH_SPEECH_API_KEY";

/// Model identifiers used by each stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub extraction: String,
    pub render: String,
    /// Long-form cascade, most capable first
    pub long_form: Vec<String>,
}

impl ModelSettings {
    pub fn from_config(config: &CompletionConfig) -> Self {
        let mut long_form: Vec<String> = config
            .long_form_models
            .iter()
            .filter(|m| !m.trim().is_empty())
            .cloned()
            .collect();
        if long_form.is_empty() {
            long_form.push(config.render_model.clone());
        }

        Self {
            extraction: config.extraction_model.clone(),
            render: config.render_model.clone(),
            long_form,
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self::from_config(&CompletionConfig::default())
    }
}

/// Resolved API keys
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub completion: Option<String>,
    pub search: Option<String>,
    pub speech: Option<String>,
}

impl Credentials {
    pub fn resolve(config: &TomlConfig) -> Self {
        Self {
            completion: resolve_secret(
                "Completion API key",
                COMPLETION_KEY_ENV,
                config.completion.api_key.as_deref(),
            ),
            search: resolve_secret(
                "Search API key",
                SEARCH_KEY_ENV,
                config.search.api_key.as_deref(),
            ),
            speech: resolve_secret(
                "Speech API key",
                SPEECH_KEY_ENV,
                config.speech.api_key.as_deref(),
            ),
        }
    }
}

/// Build HTTP clients for every service that has a key
pub fn build_services(config: &TomlConfig, credentials: &Credentials) -> Result<Services, ClientError> {
    let mut services = Services::default();

    if let Some(key) = &credentials.completion {
        services.completion = Some(Arc::new(OpenAiCompletionClient::new(
            &config.completion,
            key.clone(),
        )?));
        info!(base_url = %config.completion.base_url, "Completion client ready");
    }

    if let Some(key) = &credentials.search {
        services.search = Some(Arc::new(PerplexitySearchClient::new(
            &config.search,
            key.clone(),
        )?));
        info!(base_url = %config.search.base_url, model = %config.search.model, "Search client ready");
    }

    if let Some(key) = &credentials.speech {
        services.speech = Some(Arc::new(HttpSpeechClient::new(&config.speech, key.clone())?));
        info!(base_url = %config.speech.base_url, "Speech client ready");
    }

    Ok(services)
}
