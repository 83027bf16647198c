//! COMPILING

use super::GenerationOrchestrator;
use crate::error::PipelineError;
use crate::models::{AudioAsset, CaptionChunk, CompositionGraph, JobExtras, SegmentPlan};
use uuid::Uuid;

impl GenerationOrchestrator {
    pub(super) async fn phase_compiling(
        &self,
        job_id: Uuid,
        plan: &SegmentPlan,
        durations: &[f64],
        captions: &[CaptionChunk],
        assets: &[Option<AudioAsset>],
    ) -> Result<CompositionGraph, PipelineError> {
        let graph = self.compiler.compile(plan, durations, captions, assets)?;
        tracing::debug!(
            job_id = %job_id,
            scenes = graph.scenes.len(),
            transitions = graph.transitions.len(),
            silent = graph.audio.entries.iter().filter(|e| e.is_silence()).count(),
            "Composition compiled"
        );

        self.report(
            job_id,
            80,
            format!("Composed {} scenes", graph.scenes.len()),
            JobExtras::none(),
        )
        .await;
        Ok(graph)
    }
}
