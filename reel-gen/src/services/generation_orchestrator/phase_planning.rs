//! PLANNING and NORMALIZING

use super::GenerationOrchestrator;
use crate::error::PipelineError;
use crate::models::{Brief, JobExtras, SegmentPlan};
use uuid::Uuid;

impl GenerationOrchestrator {
    /// Candidate plan from the planner, shaped to the target duration
    pub(super) async fn phase_planning(
        &self,
        job_id: Uuid,
        brief: &Brief,
    ) -> Result<SegmentPlan, PipelineError> {
        self.report(job_id, 5, "Planning script", JobExtras::none())
            .await;

        let candidate = self.planner.generate(brief).await?;
        tracing::info!(
            job_id = %job_id,
            planner = self.planner.name(),
            segments = candidate.len(),
            "Plan generated"
        );

        let plan = self.normalizer.normalize(brief.target_duration, candidate)?;
        tracing::info!(
            job_id = %job_id,
            segments = plan.len(),
            durations = ?plan.durations(),
            "Plan normalized"
        );

        self.report(
            job_id,
            15,
            format!("Plan ready: {} segments", plan.len()),
            JobExtras::none(),
        )
        .await;
        Ok(plan)
    }
}
