//! In-memory job registry
//!
//! Sole source of truth for job status. One writer per job (its own pipeline)
//! and any number of readers. Every accepted update is published on the
//! event bus.

use chrono::Utc;
use reel_common::events::{EventBus, JobEvent};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Job, JobExtras, JobStatus, JobView};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Job {id} already {status}; update rejected")]
    AlreadyTerminal { id: Uuid, status: JobStatus },
}

/// Cloneable handle to the shared job map
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
    event_bus: EventBus,
}

impl JobRegistry {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            event_bus,
        }
    }

    /// Register a new Queued job
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let job = Job::new(id);
        let timestamp = job.created_at;
        self.jobs.write().await.insert(id, job);

        self.event_bus.emit_lossy(JobEvent::JobQueued {
            job_id: id,
            timestamp,
        });
        tracing::debug!(job_id = %id, "Job registered");
        id
    }

    /// Apply a stage update
    ///
    /// Progress never moves backwards: a lower value is ignored. Completed
    /// forces 100; Failed keeps the last progress. Updates to a terminal job
    /// are rejected.
    pub async fn update(
        &self,
        id: Uuid,
        status: JobStatus,
        progress: u8,
        message: impl Into<String>,
        extras: JobExtras,
    ) -> Result<JobView, RegistryError> {
        let message = message.into();
        let view = {
            let mut jobs = self.jobs.write().await;
            let job = jobs.get_mut(&id).ok_or(RegistryError::NotFound(id))?;

            if job.status.is_terminal() {
                tracing::warn!(
                    job_id = %id,
                    status = %job.status,
                    "Ignoring update to terminal job"
                );
                return Err(RegistryError::AlreadyTerminal {
                    id,
                    status: job.status,
                });
            }

            let now = Utc::now();
            job.progress = match status {
                JobStatus::Completed => 100,
                JobStatus::Failed => job.progress,
                _ => job.progress.max(progress.min(100)),
            };
            job.status = status;
            job.message = message;
            job.updated_at = now;
            if status.is_terminal() {
                job.finished_at = Some(now);
            }

            let JobExtras {
                artifact_ref,
                artifact_size,
                error,
                notes,
            } = extras;
            if artifact_ref.is_some() {
                job.artifact_ref = artifact_ref;
            }
            if artifact_size.is_some() {
                job.artifact_size = artifact_size;
            }
            if error.is_some() {
                job.error = error;
            }
            job.notes.extend(notes);

            job.view()
        };

        self.event_bus.emit_lossy(event_for(&view));
        Ok(view)
    }

    pub async fn get(&self, id: Uuid) -> Result<JobView, RegistryError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .map(Job::view)
            .ok_or(RegistryError::NotFound(id))
    }

    /// All jobs, newest first
    pub async fn list(&self) -> Vec<JobView> {
        let mut views: Vec<JobView> = self.jobs.read().await.values().map(Job::view).collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        views
    }
}

fn event_for(view: &JobView) -> JobEvent {
    match view.status {
        JobStatus::Completed => JobEvent::JobCompleted {
            job_id: view.job_id,
            artifact_ref: view.artifact_ref.clone().unwrap_or_default(),
            artifact_size: view.artifact_size.unwrap_or(0),
            message: view.message.clone(),
            timestamp: view.updated_at,
        },
        JobStatus::Failed => JobEvent::JobFailed {
            job_id: view.job_id,
            progress: view.progress,
            message: view.message.clone(),
            timestamp: view.updated_at,
        },
        status => JobEvent::JobProgress {
            job_id: view.job_id,
            status,
            progress: view.progress,
            message: view.message.clone(),
            timestamp: view.updated_at,
        },
    }
}
