//! PROBING

use super::GenerationOrchestrator;
use crate::error::PipelineError;
use crate::models::{AudioAsset, JobExtras, SegmentPlan};
use crate::services::segment_durations;
use uuid::Uuid;

impl GenerationOrchestrator {
    /// Measure narration; returns the timeline duration of every segment
    pub(super) async fn phase_probing(
        &self,
        job_id: Uuid,
        plan: &SegmentPlan,
        assets: &mut [Option<AudioAsset>],
        notes: &mut Vec<String>,
    ) -> Vec<f64> {
        let failures = self.prober.measure(assets).await;

        let total = plan.len();
        let estimated: Vec<String> = failures
            .iter()
            .filter_map(|e| match e {
                PipelineError::Probe { segment, .. } => Some(format!(
                    "duration estimated for segment {} of {}",
                    segment + 1,
                    total
                )),
                _ => None,
            })
            .collect();

        let durations = segment_durations(plan, assets);
        tracing::info!(
            job_id = %job_id,
            durations = ?durations,
            estimated = estimated.len(),
            "Narration measured"
        );

        self.report(
            job_id,
            60,
            "Measured narration",
            JobExtras {
                notes: estimated.clone(),
                ..JobExtras::default()
            },
        )
        .await;
        notes.extend(estimated);
        durations
    }
}
