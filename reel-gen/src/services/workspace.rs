//! Per-job temporary workspace
//!
//! Holds the narration audio of one job. `cleanup` removes it; a workspace
//! dropped without cleanup is removed synchronously as a last resort.

use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub struct JobWorkspace {
    dir: PathBuf,
    removed: bool,
}

impl JobWorkspace {
    /// Create `<work_root>/<job_id>/`
    pub async fn create(work_root: &Path, job_id: Uuid) -> io::Result<Self> {
        let dir = work_root.join(job_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(job_id = %job_id, dir = %dir.display(), "Created job workspace");
        Ok(Self {
            dir,
            removed: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn segment_audio_path(&self, segment_index: usize) -> PathBuf {
        self.dir.join(format!("segment_{}.mp3", segment_index))
    }

    /// Write narration bytes for a segment; returns the file path
    pub async fn write_segment_audio(&self, segment_index: usize, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.segment_audio_path(segment_index);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Remove the workspace and everything in it
    pub async fn cleanup(mut self) -> io::Result<()> {
        self.removed = true;
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                tracing::debug!(dir = %self.dir.display(), "Removed job workspace");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to remove job workspace");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cleanup_removes_audio() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = JobWorkspace::create(temp.path(), Uuid::new_v4()).await.unwrap();
        let path = workspace.write_segment_audio(0, b"ID3").await.unwrap();
        assert!(path.ends_with("segment_0.mp3"));
        let dir = workspace.dir().to_path_buf();

        workspace.cleanup().await.unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = {
            let workspace = JobWorkspace::create(temp.path(), Uuid::new_v4()).await.unwrap();
            workspace.write_segment_audio(1, b"x").await.unwrap();
            workspace.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }
}
