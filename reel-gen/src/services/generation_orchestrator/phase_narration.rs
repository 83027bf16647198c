//! NARRATION

use super::GenerationOrchestrator;
use crate::error::PipelineError;
use crate::models::{AudioAsset, Brief, JobExtras, SegmentPlan};
use crate::services::JobWorkspace;
use uuid::Uuid;

const NARRATION_START: u8 = 20;
const NARRATION_SPAN: usize = 35;

impl GenerationOrchestrator {
    /// Per-segment audio; `None` where both providers failed
    ///
    /// Provider failures degrade the segment; workspace I/O failures are
    /// returned and fail the job.
    pub(super) async fn phase_narration(
        &self,
        job_id: Uuid,
        brief: &Brief,
        plan: &SegmentPlan,
        workspace: &JobWorkspace,
        notes: &mut Vec<String>,
    ) -> Result<Vec<Option<AudioAsset>>, PipelineError> {
        self.report(job_id, NARRATION_START, "Synthesizing narration", JobExtras::none())
            .await;

        let outcome = self
            .narration
            .synthesize_all(&plan.segments, &brief.tone, workspace, move |done, total| {
                let progress = NARRATION_START as usize + NARRATION_SPAN * done / total.max(1);
                self.report(
                    job_id,
                    progress as u8,
                    format!("Narrated {} of {} segments", done, total),
                    JobExtras::none(),
                )
            })
            .await?;

        let total = plan.len();
        let degraded: Vec<String> = outcome
            .missing_segments()
            .into_iter()
            .map(|index| {
                format!(
                    "narration unavailable for segment {} of {}; silence substituted",
                    index + 1,
                    total
                )
            })
            .collect();
        for failure in &outcome.failures {
            tracing::warn!(job_id = %job_id, error = %failure, "Segment degraded");
        }

        if !degraded.is_empty() {
            self.report(
                job_id,
                55,
                format!("Narration done ({} of {} segments silent)", degraded.len(), total),
                JobExtras {
                    notes: degraded.clone(),
                    ..JobExtras::default()
                },
            )
            .await;
            notes.extend(degraded);
        }

        Ok(outcome.assets)
    }
}
