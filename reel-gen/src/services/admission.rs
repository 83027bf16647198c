//! Admission control
//!
//! Bounds the number of running jobs (excess submissions are rejected) and
//! the number of concurrent encoder processes (excess jobs wait).

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Clone)]
pub struct AdmissionControl {
    jobs: Arc<Semaphore>,
    max_jobs: usize,
    encoders: Arc<Semaphore>,
}

impl AdmissionControl {
    pub fn new(max_jobs: usize, max_encoders: usize) -> Self {
        let max_jobs = max_jobs.max(1);
        Self {
            jobs: Arc::new(Semaphore::new(max_jobs)),
            max_jobs,
            encoders: Arc::new(Semaphore::new(max_encoders.max(1))),
        }
    }

    /// Reserve a job slot; `None` when the service is at capacity
    ///
    /// The slot is released when the permit is dropped.
    pub fn try_admit(&self) -> Option<OwnedSemaphorePermit> {
        self.jobs.clone().try_acquire_owned().ok()
    }

    /// Semaphore bounding concurrent encoder processes
    pub fn encoder_slots(&self) -> Arc<Semaphore> {
        self.encoders.clone()
    }

    pub fn active_jobs(&self) -> usize {
        self.max_jobs - self.jobs.available_permits()
    }

    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_beyond_limit_and_releases_on_drop() {
        let admission = AdmissionControl::new(2, 1);
        let first = admission.try_admit().unwrap();
        let _second = admission.try_admit().unwrap();
        assert!(admission.try_admit().is_none());
        assert_eq!(admission.active_jobs(), 2);

        drop(first);
        assert!(admission.try_admit().is_some());
    }
}
