//! Job event types and the in-process event bus
//!
//! The generation service emits one event per accepted job update. SSE
//! endpoints subscribe to the bus and forward events to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Lifecycle status of a generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, pipeline not started yet
    Queued,
    /// Pipeline running
    Processing,
    /// Artifact produced
    Completed,
    /// Aborted by a fatal stage error
    Failed,
}

impl JobStatus {
    /// Completed and Failed are terminal; nothing changes after them
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Reel event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JobEvent {
    /// Job accepted and registered
    JobQueued {
        job_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Stage boundary or intra-stage progress
    JobProgress {
        job_id: Uuid,
        status: JobStatus,
        progress: u8,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Artifact written
    JobCompleted {
        job_id: Uuid,
        artifact_ref: String,
        artifact_size: u64,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Job aborted
    JobFailed {
        job_id: Uuid,
        progress: u8,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            JobEvent::JobQueued { .. } => "JobQueued",
            JobEvent::JobProgress { .. } => "JobProgress",
            JobEvent::JobCompleted { .. } => "JobCompleted",
            JobEvent::JobFailed { .. } => "JobFailed",
        }
    }

    /// Job the event belongs to
    pub fn job_id(&self) -> Uuid {
        match self {
            JobEvent::JobQueued { job_id, .. }
            | JobEvent::JobProgress { job_id, .. }
            | JobEvent::JobCompleted { job_id, .. }
            | JobEvent::JobFailed { job_id, .. } => *job_id,
        }
    }

    /// True for the last event a job will ever emit
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::JobCompleted { .. } | JobEvent::JobFailed { .. })
    }
}

/// Broadcast event bus shared by the registry and SSE handlers
///
/// ```
/// use reel_common::events::{EventBus, JobEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy(JobEvent::JobQueued {
///     job_id: uuid::Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// });
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: JobEvent) {
        let _ = self.tx.send(event);
    }
}
