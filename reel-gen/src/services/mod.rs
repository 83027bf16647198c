//! Service modules for the generation pipeline
//!
//! Leaf services each own one stage (or one external dependency); the
//! [`generation_orchestrator`] wires them into a job.

pub mod admission;
pub mod caption_timeline;
pub mod composition_submitter;
pub mod duration_normalizer;
pub mod duration_prober;
pub mod encoder;
pub mod filter_graph;
pub mod generation_orchestrator;
pub mod job_registry;
pub mod narration;
pub mod openai_client;
pub mod plan_generator;
pub mod scene_compiler;
pub mod speech_providers;
pub mod workspace;

pub use admission::AdmissionControl;
pub use caption_timeline::{CaptionSettings, CaptionTimelineBuilder, Transcriber, WhisperTranscriber};
pub use composition_submitter::{Artifact, CompositionSubmitter};
pub use duration_normalizer::{tier_max_segments, DurationNormalizer};
pub use duration_prober::{segment_durations, DurationProbe, DurationProber, FfprobeProber, ProbeError};
pub use encoder::{diagnostic_tail, EncoderBackend, EncoderRun, FfmpegEncoder};
pub use filter_graph::EncodeRequest;
pub use generation_orchestrator::{GenerationOrchestrator, Providers};
pub use job_registry::{JobRegistry, RegistryError};
pub use narration::{NarrationOutcome, NarrationSynthesizer, SpeechError, SpeechProvider, VoiceProfile};
pub use openai_client::{OpenAiClient, OpenAiError};
pub use plan_generator::{OpenAiPlanGenerator, PlanGenerator, TemplatePlanGenerator};
pub use scene_compiler::SceneCompiler;
pub use speech_providers::{ElevenLabsSpeech, OpenAiSpeech};
pub use workspace::JobWorkspace;
