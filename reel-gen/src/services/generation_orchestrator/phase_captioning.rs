//! CAPTIONING

use super::GenerationOrchestrator;
use crate::models::{AudioAsset, CaptionChunk, JobExtras, SegmentPlan};
use uuid::Uuid;

impl GenerationOrchestrator {
    pub(super) async fn phase_captioning(
        &self,
        job_id: Uuid,
        plan: &SegmentPlan,
        durations: &[f64],
        assets: &[Option<AudioAsset>],
    ) -> Vec<CaptionChunk> {
        let captions = self.captions.build(plan, durations, assets).await;
        tracing::info!(
            job_id = %job_id,
            strategy = ?self.captions.strategy(),
            chunks = captions.len(),
            "Caption timeline built"
        );

        self.report(
            job_id,
            70,
            format!("Timed {} captions", captions.len()),
            JobExtras::none(),
        )
        .await;
        captions
    }
}
