//! Composition submission
//!
//! Serializes the graph, runs the encoder under the shared encoder limit and
//! removes the job workspace whatever the outcome.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::CompositionGraph;
use crate::services::encoder::{diagnostic_tail, EncoderBackend};
use crate::services::filter_graph::EncodeRequest;
use crate::services::workspace::JobWorkspace;

/// Finished video
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    /// Public reference (`/videos/<job_id>.mp4`)
    pub artifact_ref: String,
    pub size_bytes: u64,
}

pub struct CompositionSubmitter {
    backend: Arc<dyn EncoderBackend>,
    encoder_slots: Arc<Semaphore>,
    output_dir: PathBuf,
    font_file: Option<PathBuf>,
    tail_lines: usize,
}

impl CompositionSubmitter {
    pub fn new(
        backend: Arc<dyn EncoderBackend>,
        encoder_slots: Arc<Semaphore>,
        output_dir: PathBuf,
        font_file: Option<PathBuf>,
        tail_lines: usize,
    ) -> Self {
        Self {
            backend,
            encoder_slots,
            output_dir,
            font_file,
            tail_lines: tail_lines.max(1),
        }
    }

    /// Encode the graph into `<output_dir>/<job_id>.mp4`
    ///
    /// Consumes the workspace; it is removed on every path.
    pub async fn submit(
        &self,
        job_id: Uuid,
        graph: &CompositionGraph,
        workspace: JobWorkspace,
    ) -> Result<Artifact, PipelineError> {
        let result = self.encode(job_id, graph).await;

        if let Err(e) = workspace.cleanup().await {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to remove job workspace");
        }
        result
    }

    async fn encode(&self, job_id: Uuid, graph: &CompositionGraph) -> Result<Artifact, PipelineError> {
        let partial = self.output_dir.join(format!("{}.partial.mp4", job_id));
        let final_path = self.output_dir.join(format!("{}.mp4", job_id));
        let request = EncodeRequest::from_graph(graph, partial.clone(), self.font_file.as_deref());

        let run = {
            let _slot = self
                .encoder_slots
                .acquire()
                .await
                .map_err(|_| PipelineError::Encoding("encoder pool closed".to_string()))?;
            tracing::info!(
                job_id = %job_id,
                scenes = graph.scenes.len(),
                transitions = graph.transitions.len(),
                captions = graph.captions.len(),
                duration = graph.total_duration(),
                "Encoding composition"
            );
            self.backend.encode(&request).await
        };

        let run = match run {
            Ok(run) => run,
            Err(e) => {
                return Err(PipelineError::Encoding(format!(
                    "failed to start encoder: {}",
                    e
                )))
            }
        };

        if !run.success {
            remove_quietly(&partial).await;
            let tail = diagnostic_tail(&run.stderr, self.tail_lines);
            let code = run
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(PipelineError::Encoding(if tail.is_empty() {
                format!("encoder exited with status {}", code)
            } else {
                format!("encoder exited with status {}: {}", code, tail)
            }));
        }

        let size = match tokio::fs::metadata(&partial).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => {
                remove_quietly(&partial).await;
                return Err(PipelineError::Encoding(
                    "encoder reported success but produced no output".to_string(),
                ));
            }
        };

        tokio::fs::rename(&partial, &final_path).await?;

        Ok(Artifact {
            path: final_path,
            artifact_ref: format!("/videos/{}.mp4", job_id),
            size_bytes: size,
        })
    }
}

async fn remove_quietly(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial output");
        }
    }
}
