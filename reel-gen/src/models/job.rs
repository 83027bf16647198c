//! Generation job record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use reel_common::events::JobStatus;

/// Job state owned by the registry
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    /// 0..=100, non-decreasing until terminal
    pub progress: u8,
    pub message: String,
    pub artifact_ref: Option<String>,
    pub artifact_size: Option<u64>,
    pub error: Option<String>,
    /// Degradations the job survived (silence substituted, estimated durations)
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            message: "Queued".to_string(),
            artifact_ref: None,
            artifact_size: None,
            error: None,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    pub fn view(&self) -> JobView {
        JobView {
            job_id: self.id,
            status: self.status,
            progress: self.progress,
            message: self.message.clone(),
            artifact_ref: self.artifact_ref.clone(),
            artifact_size: self.artifact_size,
            error: self.error.clone(),
            notes: self.notes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            finished_at: self.finished_at,
        }
    }
}

/// Optional fields carried by an update
#[derive(Debug, Clone, Default)]
pub struct JobExtras {
    pub artifact_ref: Option<String>,
    pub artifact_size: Option<u64>,
    pub error: Option<String>,
    /// Appended to the job's notes
    pub notes: Vec<String>,
}

impl JobExtras {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_note(note: impl Into<String>) -> Self {
        Self {
            notes: vec![note.into()],
            ..Self::default()
        }
    }

    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Read-only snapshot returned by the status API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_is_camel_case_and_omits_empty_options() {
        let job = Job::new(Uuid::new_v4());
        let json = serde_json::to_value(job.view()).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["progress"], 0);
        assert!(json.get("jobId").is_some());
        assert!(json.get("artifactRef").is_none());
        assert!(json["notes"].as_array().unwrap().is_empty());
    }
}
