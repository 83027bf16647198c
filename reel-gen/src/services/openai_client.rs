//! OpenAI-compatible API client
//!
//! Chat completions (plan generation), speech synthesis and word-level
//! transcription share one HTTP client and key.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::models::TranscriptWord;

const USER_AGENT: &str = concat!("reel-gen/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("OpenAI API key not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    words: Vec<TranscriptWord>,
}

pub struct OpenAiClient {
    http_client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, OpenAiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| OpenAiError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn key(&self) -> Result<&str, OpenAiError> {
        self.api_key.as_deref().ok_or(OpenAiError::MissingApiKey)
    }

    /// Run a chat completion constrained to a JSON object; returns the content
    pub async fn chat_json(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<String, OpenAiError> {
        let key = self.key()?;
        let url = format!("{}/chat/completions", self.api_base);
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.7,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        tracing::debug!(url = %url, model = %model, "Requesting chat completion");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| OpenAiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OpenAiError::ApiError(status.as_u16(), error_text));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| OpenAiError::ParseError(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OpenAiError::ParseError("completion has no content".to_string()))
    }

    /// Synthesize speech; returns mp3 bytes
    pub async fn speech(&self, model: &str, voice: &str, input: &str) -> Result<Vec<u8>, OpenAiError> {
        let key = self.key()?;
        let url = format!("{}/audio/speech", self.api_base);
        let request = SpeechRequest {
            model,
            input,
            voice,
            response_format: "mp3",
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| OpenAiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OpenAiError::ApiError(status.as_u16(), error_text));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OpenAiError::NetworkError(e.to_string()))?;
        if bytes.is_empty() {
            return Err(OpenAiError::ParseError("empty audio response".to_string()));
        }
        Ok(bytes.to_vec())
    }

    /// Transcribe an audio file with word-level timestamps
    pub async fn transcribe_words(
        &self,
        model: &str,
        audio_path: &Path,
    ) -> Result<Vec<TranscriptWord>, OpenAiError> {
        let key = self.key()?;
        let url = format!("{}/audio/transcriptions", self.api_base);

        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| OpenAiError::ParseError(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", model.to_string())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| OpenAiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OpenAiError::ApiError(status.as_u16(), error_text));
        }

        let transcription: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| OpenAiError::ParseError(e.to_string()))?;

        if transcription.words.is_empty() {
            return Err(OpenAiError::ParseError(
                "transcription returned no word timestamps".to_string(),
            ));
        }
        Ok(transcription.words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let client = OpenAiClient::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        assert!(!client.has_api_key());
        let result = client.speech("tts-1", "alloy", "hello").await;
        assert!(matches!(result, Err(OpenAiError::MissingApiKey)));
    }

    #[test]
    fn test_verbose_transcription_parses_words() {
        let parsed: VerboseTranscription = serde_json::from_str(
            r#"{"text":"hi there","words":[{"word":"hi","start":0.0,"end":0.3},{"word":"there","start":0.3,"end":0.8}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.words.len(), 2);
        assert_eq!(parsed.words[1].word, "there");
    }

    #[test]
    fn test_trailing_slash_trimmed_from_base() {
        let client =
            OpenAiClient::new("https://example.test/v1/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(client.api_base, "https://example.test/v1");
    }
}
