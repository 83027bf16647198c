//! Configuration for reel-gen
//!
//! Bootstrap values follow CLI → ENV → TOML → compiled default. Every TOML
//! section is optional; a missing file starts the service with defaults.
//!
//! API keys resolve ENV → TOML. A missing key is not fatal: the provider that
//! needs it fails per call, which the pipeline treats like any other
//! provider failure (fallback, silence, or template planner).

use reel_common::config::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5780;

/// Module name used for config file lookup and logging
pub const MODULE_NAME: &str = "reel-gen";

/// Complete service configuration (TOML file `reel-gen.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server port
    pub port: u16,
    /// Root folder (output + work directories live below it)
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub api_keys: ApiKeysConfig,
    pub planner: PlannerConfig,
    pub narration: NarrationConfig,
    pub normalizer: NormalizerConfig,
    pub captions: CaptionConfig,
    pub composition: CompositionConfig,
    pub encoder: EncoderConfig,
    pub limits: LimitsConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            root_folder: None,
            logging: LoggingConfig::default(),
            api_keys: ApiKeysConfig::default(),
            planner: PlannerConfig::default(),
            narration: NarrationConfig::default(),
            normalizer: NormalizerConfig::default(),
            captions: CaptionConfig::default(),
            composition: CompositionConfig::default(),
            encoder: EncoderConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// API keys stored in TOML (lowest priority, ENV wins)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeysConfig {
    pub openai_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
}

/// Which plan generator to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerProvider {
    /// OpenAI-compatible chat completions endpoint
    #[serde(rename = "openai")]
    OpenAi,
    /// Offline deterministic template
    Template,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub provider: PlannerProvider,
    pub model: String,
    /// Base URL of the OpenAI-compatible API (also used for speech/transcription)
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            provider: PlannerProvider::OpenAi,
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Per-call timeout for every synthesis request
    pub timeout_secs: u64,
    /// Segments synthesized concurrently within one job
    pub max_parallel: usize,
    pub openai_model: String,
    pub elevenlabs_model: String,
    pub elevenlabs_api_base: String,
    /// Disable to run without a secondary provider
    pub enable_fallback: bool,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_parallel: 3,
            openai_model: "tts-1".to_string(),
            elevenlabs_model: "eleven_multilingual_v2".to_string(),
            elevenlabs_api_base: "https://api.elevenlabs.io/v1".to_string(),
            enable_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub min_segment_secs: f64,
    pub max_segment_secs: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_segment_secs: 2.0,
            max_segment_secs: 20.0,
        }
    }
}

/// Caption timing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionStrategy {
    /// Uniform speaking rate per segment (no extra external call)
    SpeechRate,
    /// Word timestamps from a transcript of the rendered audio
    TranscriptAligned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub strategy: CaptionStrategy,
    pub target_words_per_chunk: f64,
    pub min_words: usize,
    pub max_words: usize,
    /// Transcription model (transcript-aligned strategy only)
    pub transcription_model: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            strategy: CaptionStrategy::SpeechRate,
            target_words_per_chunk: 8.0,
            min_words: 3,
            max_words: 6,
            transcription_model: "whisper-1".to_string(),
        }
    }
}

/// How segments map to scenes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneMode {
    /// One scene per segment
    PerSegment,
    /// Split segments into sub-scenes at caption boundaries
    Dynamic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub transition_secs: f64,
    pub scene_mode: SceneMode,
    /// Font used for caption overlays; fontconfig default when unset
    pub font_file: Option<PathBuf>,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            transition_secs: 0.5,
            scene_mode: SceneMode::PerSegment,
            font_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Encoder processes allowed to run at once (others wait)
    pub max_concurrent: usize,
    /// Non-empty stderr lines kept in a failed job's message
    pub diagnostic_tail_lines: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            max_concurrent: 2,
            diagnostic_tail_lines: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Jobs allowed to run at once; submissions beyond this get 503
    pub max_active_jobs: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_active_jobs: 16 }
    }
}

impl ServiceConfig {
    /// OpenAI key: REEL_OPENAI_API_KEY → OPENAI_API_KEY → TOML
    pub fn openai_api_key(&self) -> Option<String> {
        resolve_api_key(
            "OpenAI",
            &["REEL_OPENAI_API_KEY", "OPENAI_API_KEY"],
            self.api_keys.openai_api_key.as_deref(),
        )
    }

    /// ElevenLabs key: REEL_ELEVENLABS_API_KEY → ELEVENLABS_API_KEY → TOML
    pub fn elevenlabs_api_key(&self) -> Option<String> {
        resolve_api_key(
            "ElevenLabs",
            &["REEL_ELEVENLABS_API_KEY", "ELEVENLABS_API_KEY"],
            self.api_keys.elevenlabs_api_key.as_deref(),
        )
    }
}

/// Resolve an API key from environment variables, then TOML
///
/// Warns when the key is present in more than one source.
pub fn resolve_api_key(label: &str, env_vars: &[&str], toml_value: Option<&str>) -> Option<String> {
    let env_key = env_vars
        .iter()
        .filter_map(|var| std::env::var(var).ok().map(|value| (*var, value)))
        .find(|(_, value)| is_valid_key(value));
    let toml_key = toml_value.filter(|value| is_valid_key(value));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in environment and TOML. Using environment (higher priority).",
            label
        );
    }

    if let Some((var, key)) = env_key {
        info!("{} API key loaded from environment variable {}", label, var);
        return Some(key.trim().to_string());
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", label);
        return Some(key.trim().to_string());
    }

    warn!("{} API key not configured", label);
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
