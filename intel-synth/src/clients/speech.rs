//! Dialogue speech synthesis client
//!
//! # API Reference
//! - Endpoint: `POST {base_url}/dialogue`
//! - Auth: bearer token
//! - Body: `{text, roles, word_count, style_tags}`
//! - Response: `{audio: <base64>, format, transcript}`

use super::{build_http_client, ClientError, DialogueRequest, SpeechClient, SpeechOutput};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use intel_common::config::SpeechConfig;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct WireSpeechResponse {
    audio: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    transcript: Option<String>,
}

pub struct HttpSpeechClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl HttpSpeechClient {
    pub fn new(config: &SpeechConfig, api_key: String) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http_client(config.timeout_secs)?,
            endpoint: format!("{}/dialogue", config.base_url.trim_end_matches('/')),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl SpeechClient for HttpSpeechClient {
    async fn synthesize(&self, request: DialogueRequest) -> Result<SpeechOutput, ClientError> {
        debug!(
            roles = ?request.roles,
            word_count = request.word_count,
            script_chars = request.text.len(),
            "Sending dialogue synthesis request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let wire: WireSpeechResponse = response
            .json()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.timeout_secs))?;

        decode_speech_response(wire)
    }
}

fn decode_speech_response(wire: WireSpeechResponse) -> Result<SpeechOutput, ClientError> {
    let encoded = wire
        .audio
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ClientError::Decode("speech response carried no audio".to_string()))?;

    let audio = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| ClientError::Decode(format!("invalid base64 audio: {}", e)))?;

    Ok(SpeechOutput {
        audio,
        format: wire.format.unwrap_or_else(|| "mp3".to_string()),
        transcript: wire.transcript.unwrap_or_default(),
    })
}
