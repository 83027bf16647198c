//! Concrete speech providers
//!
//! OpenAI speech is the primary; ElevenLabs is the fallback. Each maps the
//! provider-neutral voice profile through its own voice table.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::services::narration::{SpeechError, SpeechProvider, VoiceProfile};
use crate::services::openai_client::OpenAiClient;

/// OpenAI voice name for a profile
pub fn openai_voice(voice: VoiceProfile) -> &'static str {
    match voice {
        VoiceProfile::Warm => "alloy",
        VoiceProfile::Bright => "nova",
        VoiceProfile::Calm => "shimmer",
        VoiceProfile::Authoritative => "onyx",
        VoiceProfile::Smooth => "fable",
    }
}

/// ElevenLabs premade voice id for a profile
pub fn elevenlabs_voice(voice: VoiceProfile) -> &'static str {
    match voice {
        VoiceProfile::Warm => "TxGEqnHWrfWFTfGW9XjX",          // Josh
        VoiceProfile::Bright => "EXAVITQu4vr4xnSDxMaL",        // Bella
        VoiceProfile::Calm => "21m00Tcm4TlvDq8ikWAM",          // Rachel
        VoiceProfile::Authoritative => "pNInz6obpgDQGcFmaJgB", // Adam
        VoiceProfile::Smooth => "ErXwobaYiN019PkySvjV",        // Antoni
    }
}

pub struct OpenAiSpeech {
    client: Arc<OpenAiClient>,
    model: String,
}

impl OpenAiSpeech {
    pub fn new(client: Arc<OpenAiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl SpeechProvider for OpenAiSpeech {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn synthesize(&self, text: &str, voice: VoiceProfile) -> Result<Vec<u8>, SpeechError> {
        self.client
            .speech(&self.model, openai_voice(voice), text)
            .await
            .map_err(|e| SpeechError::Provider {
                provider: "openai",
                message: e.to_string(),
            })
    }
}

#[derive(Debug, Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

pub struct ElevenLabsSpeech {
    http_client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl ElevenLabsSpeech {
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SpeechError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpeechError::Provider {
                provider: "elevenlabs",
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    fn error(message: impl Into<String>) -> SpeechError {
        SpeechError::Provider {
            provider: "elevenlabs",
            message: message.into(),
        }
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsSpeech {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    async fn synthesize(&self, text: &str, voice: VoiceProfile) -> Result<Vec<u8>, SpeechError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Self::error("API key not configured"))?;
        let url = format!("{}/text-to-speech/{}", self.api_base, elevenlabs_voice(voice));
        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .header("xi-api-key", key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::error(format!("network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::error(format!("API error {}: {}", status.as_u16(), error_text)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::error(format!("network error: {}", e)))?;
        Ok(bytes.to_vec())
    }
}
