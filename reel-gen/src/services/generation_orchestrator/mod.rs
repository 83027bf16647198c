//! Generation orchestrator
//!
//! One parameterized pipeline per job. Stages run strictly in order, each
//! consuming the previous stage's concrete output:
//!
//! ```text
//! PLANNING → NORMALIZING → NARRATION → PROBING → CAPTIONING → COMPILING → ENCODING
//!    5%         15%         20–55%      60%        70%          80%       85% → 100%
//! ```
//!
//! Recoverable errors (narration, probing) degrade one segment and are
//! recorded as job notes. Anything else fails the job; the job workspace is
//! removed on every path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{CaptionStrategy, PlannerProvider, ServiceConfig};
use crate::error::PipelineError;
use crate::models::{Brief, CompositionGraph, JobExtras, JobStatus, SegmentPlan};
use crate::services::{
    AdmissionControl, Artifact, CaptionSettings, CaptionTimelineBuilder, CompositionSubmitter,
    DurationNormalizer, DurationProbe, DurationProber, ElevenLabsSpeech, EncoderBackend,
    FfmpegEncoder, FfprobeProber, JobRegistry, JobWorkspace, NarrationSynthesizer, OpenAiClient,
    OpenAiPlanGenerator, OpenAiSpeech, PlanGenerator, SceneCompiler, SpeechProvider,
    TemplatePlanGenerator, Transcriber, WhisperTranscriber,
};

mod phase_captioning;
mod phase_compiling;
mod phase_encoding;
mod phase_narration;
mod phase_planning;
mod phase_probing;

/// External collaborators of the pipeline
pub struct Providers {
    pub planner: Arc<dyn PlanGenerator>,
    pub primary_speech: Arc<dyn SpeechProvider>,
    pub fallback_speech: Option<Arc<dyn SpeechProvider>>,
    pub probe: Arc<dyn DurationProbe>,
    /// Only used by transcript-aligned captions
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub encoder: Arc<dyn EncoderBackend>,
}

impl Providers {
    /// Real providers (OpenAI, ElevenLabs, ffprobe, ffmpeg) from configuration
    pub fn from_config(config: &ServiceConfig) -> reel_common::Result<Self> {
        let openai = Arc::new(
            OpenAiClient::new(
                config.planner.api_base.clone(),
                config.openai_api_key(),
                Duration::from_secs(config.planner.timeout_secs.max(1)),
            )
            .map_err(|e| reel_common::Error::Config(format!("OpenAI client: {}", e)))?,
        );

        let planner: Arc<dyn PlanGenerator> = match config.planner.provider {
            PlannerProvider::OpenAi if openai.has_api_key() => Arc::new(OpenAiPlanGenerator::new(
                openai.clone(),
                config.planner.model.clone(),
            )),
            PlannerProvider::OpenAi => {
                tracing::warn!("No OpenAI API key; using the template planner");
                Arc::new(TemplatePlanGenerator)
            }
            PlannerProvider::Template => Arc::new(TemplatePlanGenerator),
        };

        let fallback_speech: Option<Arc<dyn SpeechProvider>> = if config.narration.enable_fallback {
            let provider = ElevenLabsSpeech::new(
                config.narration.elevenlabs_api_base.clone(),
                config.elevenlabs_api_key(),
                config.narration.elevenlabs_model.clone(),
                Duration::from_secs(config.narration.timeout_secs.max(1)),
            )
            .map_err(|e| reel_common::Error::Config(format!("ElevenLabs client: {}", e)))?;
            Some(Arc::new(provider))
        } else {
            None
        };

        let transcriber: Option<Arc<dyn Transcriber>> =
            match config.captions.strategy {
                CaptionStrategy::TranscriptAligned => Some(Arc::new(WhisperTranscriber::new(
                    openai.clone(),
                    config.captions.transcription_model.clone(),
                ))),
                CaptionStrategy::SpeechRate => None,
            };

        Ok(Self {
            planner,
            primary_speech: Arc::new(OpenAiSpeech::new(
                openai,
                config.narration.openai_model.clone(),
            )),
            fallback_speech,
            probe: Arc::new(FfprobeProber::new(config.encoder.ffprobe_path.clone())),
            transcriber,
            encoder: Arc::new(FfmpegEncoder::new(config.encoder.ffmpeg_path.clone())),
        })
    }
}

/// Runs generation jobs and reports their progress to the registry
pub struct GenerationOrchestrator {
    registry: JobRegistry,
    planner: Arc<dyn PlanGenerator>,
    normalizer: DurationNormalizer,
    narration: NarrationSynthesizer,
    prober: DurationProber,
    captions: CaptionTimelineBuilder,
    compiler: SceneCompiler,
    submitter: CompositionSubmitter,
    work_dir: PathBuf,
}

impl GenerationOrchestrator {
    pub fn new(
        config: &ServiceConfig,
        providers: Providers,
        registry: JobRegistry,
        admission: &AdmissionControl,
        output_dir: PathBuf,
        work_dir: PathBuf,
    ) -> Self {
        tracing::info!(
            planner = providers.planner.name(),
            captions = ?config.captions.strategy,
            scene_mode = ?config.composition.scene_mode,
            "Generation pipeline configured"
        );

        Self {
            registry,
            planner: providers.planner,
            normalizer: DurationNormalizer::new(&config.normalizer),
            narration: NarrationSynthesizer::new(
                providers.primary_speech,
                providers.fallback_speech,
                Duration::from_secs(config.narration.timeout_secs.max(1)),
                config.narration.max_parallel,
            ),
            prober: DurationProber::new(providers.probe),
            captions: CaptionTimelineBuilder::new(
                CaptionSettings::from(&config.captions),
                config.captions.strategy,
                providers.transcriber,
            ),
            compiler: SceneCompiler::new(&config.composition),
            submitter: CompositionSubmitter::new(
                providers.encoder,
                admission.encoder_slots(),
                output_dir,
                config.composition.font_file.clone(),
                config.encoder.diagnostic_tail_lines,
            ),
            work_dir,
        }
    }

    /// Run one job to a terminal status
    ///
    /// Never returns an error: failures become the job's Failed status.
    pub async fn run(&self, job_id: Uuid, brief: Brief) {
        let started = std::time::Instant::now();
        match self.execute(job_id, &brief).await {
            Ok(()) => {
                tracing::info!(
                    job_id = %job_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Generation job completed"
                );
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Generation job failed");
                let message = e.to_string();
                if let Err(update_err) = self
                    .registry
                    .update(job_id, JobStatus::Failed, 0, message.clone(), JobExtras::with_error(message))
                    .await
                {
                    tracing::warn!(job_id = %job_id, error = %update_err, "Could not record job failure");
                }
            }
        }
    }

    async fn execute(&self, job_id: Uuid, brief: &Brief) -> Result<(), PipelineError> {
        let plan = self.phase_planning(job_id, brief).await?;

        let workspace = JobWorkspace::create(&self.work_dir, job_id).await?;
        let mut notes = Vec::new();
        let graph = match self
            .assemble(job_id, brief, &plan, &workspace, &mut notes)
            .await
        {
            Ok(graph) => graph,
            Err(e) => {
                if let Err(cleanup_err) = workspace.cleanup().await {
                    tracing::warn!(job_id = %job_id, error = %cleanup_err, "Failed to remove job workspace");
                }
                return Err(e);
            }
        };

        let artifact = self.phase_encoding(job_id, &graph, workspace).await?;
        self.complete(job_id, artifact, &notes).await;
        Ok(())
    }

    /// Narration through composition; everything that needs the workspace
    async fn assemble(
        &self,
        job_id: Uuid,
        brief: &Brief,
        plan: &SegmentPlan,
        workspace: &JobWorkspace,
        notes: &mut Vec<String>,
    ) -> Result<CompositionGraph, PipelineError> {
        let mut assets = self
            .phase_narration(job_id, brief, plan, workspace, notes)
            .await?;
        let durations = self.phase_probing(job_id, plan, &mut assets, notes).await;
        let captions = self
            .phase_captioning(job_id, plan, &durations, &assets)
            .await;
        self.phase_compiling(job_id, plan, &durations, &captions, &assets)
            .await
    }

    async fn complete(&self, job_id: Uuid, artifact: Artifact, notes: &[String]) {
        let message = if notes.is_empty() {
            "Video ready".to_string()
        } else {
            format!("Video ready with degraded output: {}", notes.join("; "))
        };

        let extras = JobExtras {
            artifact_ref: Some(artifact.artifact_ref),
            artifact_size: Some(artifact.size_bytes),
            ..JobExtras::default()
        };
        if let Err(e) = self
            .registry
            .update(job_id, JobStatus::Completed, 100, message, extras)
            .await
        {
            tracing::warn!(job_id = %job_id, error = %e, "Could not record job completion");
        }
    }

    /// Stage boundary update; registry errors are logged, never fatal
    async fn report(&self, job_id: Uuid, progress: u8, message: impl Into<String>, extras: JobExtras) {
        if let Err(e) = self
            .registry
            .update(job_id, JobStatus::Processing, progress, message, extras)
            .await
        {
            tracing::warn!(job_id = %job_id, error = %e, "Progress update rejected");
        }
    }
}
