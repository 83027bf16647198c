//! ENCODING

use super::GenerationOrchestrator;
use crate::error::PipelineError;
use crate::models::{CompositionGraph, JobExtras};
use crate::services::{Artifact, JobWorkspace};
use uuid::Uuid;

impl GenerationOrchestrator {
    /// Hand the graph to the encoder; the workspace is removed either way
    pub(super) async fn phase_encoding(
        &self,
        job_id: Uuid,
        graph: &CompositionGraph,
        workspace: JobWorkspace,
    ) -> Result<Artifact, PipelineError> {
        self.report(job_id, 85, "Encoding video", JobExtras::none())
            .await;

        let artifact = self.submitter.submit(job_id, graph, workspace).await?;
        tracing::info!(
            job_id = %job_id,
            path = %artifact.path.display(),
            size_bytes = artifact.size_bytes,
            "Video encoded"
        );
        Ok(artifact)
    }
}
