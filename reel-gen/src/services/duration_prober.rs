//! Rendered duration measurement
//!
//! The measured length of each narration file is authoritative for captions
//! and composition. When measuring fails the requested duration is kept and
//! the asset stays flagged approximate.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;

use crate::error::PipelineError;
use crate::models::{AudioAsset, SegmentPlan};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run ffprobe: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ffprobe exited with {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("unusable duration: {0}")]
    Parse(String),
}

/// External duration probe
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration of the media file in seconds
    async fn probe(&self, path: &Path) -> Result<f64, ProbeError>;
}

/// ffprobe-backed probe
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

#[async_trait]
impl DurationProbe for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<f64, ProbeError> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProbeError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_ffprobe_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -show_entries format=duration -of json` output
pub fn parse_ffprobe_duration(stdout: &str) -> Result<f64, ProbeError> {
    let parsed: FfprobeOutput =
        serde_json::from_str(stdout).map_err(|e| ProbeError::Parse(e.to_string()))?;
    let raw = parsed
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| ProbeError::Parse("no format.duration".to_string()))?;
    let duration: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ProbeError::Parse(raw.clone()))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(ProbeError::Parse(raw));
    }
    Ok(duration)
}

pub struct DurationProber {
    probe: Arc<dyn DurationProbe>,
}

impl DurationProber {
    pub fn new(probe: Arc<dyn DurationProbe>) -> Self {
        Self { probe }
    }

    /// Replace requested durations with measured ones
    ///
    /// Returns one recoverable error per asset that could not be measured.
    pub async fn measure(&self, assets: &mut [Option<AudioAsset>]) -> Vec<PipelineError> {
        let probes = assets.iter().map(|asset| async move {
            match asset {
                Some(asset) => Some(self.probe.probe(&asset.path).await),
                None => None,
            }
        });
        let results = join_all(probes).await;

        let mut failures = Vec::new();
        for (asset, result) in assets.iter_mut().zip(results) {
            let (Some(asset), Some(result)) = (asset.as_mut(), result) else {
                continue;
            };
            match result {
                Ok(duration) => {
                    tracing::debug!(
                        segment = asset.segment_index,
                        requested = asset.duration,
                        measured = duration,
                        "Measured narration"
                    );
                    asset.duration = duration;
                    asset.approximate = false;
                }
                Err(e) => {
                    tracing::warn!(
                        segment = asset.segment_index,
                        error = %e,
                        "Duration probe failed; using requested duration"
                    );
                    asset.approximate = true;
                    failures.push(PipelineError::Probe {
                        segment: asset.segment_index,
                        message: e.to_string(),
                    });
                }
            }
        }
        failures
    }
}

/// Duration of every segment on the output timeline
///
/// Measured (or estimated) asset duration where audio exists, the
/// requested duration where narration is missing.
pub fn segment_durations(plan: &SegmentPlan, assets: &[Option<AudioAsset>]) -> Vec<f64> {
    plan.segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            assets
                .get(index)
                .and_then(Option::as_ref)
                .map(|asset| asset.duration)
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(segment.duration)
        })
        .collect()
}
