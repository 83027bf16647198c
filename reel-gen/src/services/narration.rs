//! Narration synthesis
//!
//! One synthesis call per segment, bounded in parallel. Every call has a
//! timeout; a failed primary call gets exactly one attempt on the fallback
//! provider. A segment that fails on both is reported and left without
//! audio; the job continues.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::error::PipelineError;
use crate::models::{AudioAsset, EnergyTag, Segment};
use crate::services::workspace::JobWorkspace;

/// Provider-neutral voice character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceProfile {
    Warm,
    Bright,
    Calm,
    Authoritative,
    Smooth,
}

/// Tone keyword → voice, checked in order
const TONE_VOICES: &[(&str, VoiceProfile)] = &[
    ("energetic", VoiceProfile::Bright),
    ("exciting", VoiceProfile::Bright),
    ("playful", VoiceProfile::Bright),
    ("fun", VoiceProfile::Bright),
    ("bold", VoiceProfile::Bright),
    ("calm", VoiceProfile::Calm),
    ("soothing", VoiceProfile::Calm),
    ("relaxed", VoiceProfile::Calm),
    ("professional", VoiceProfile::Authoritative),
    ("corporate", VoiceProfile::Authoritative),
    ("authoritative", VoiceProfile::Authoritative),
    ("trustworthy", VoiceProfile::Authoritative),
    ("luxury", VoiceProfile::Smooth),
    ("elegant", VoiceProfile::Smooth),
    ("sophisticated", VoiceProfile::Smooth),
    ("friendly", VoiceProfile::Warm),
    ("warm", VoiceProfile::Warm),
    ("casual", VoiceProfile::Warm),
];

/// Voice used when the tone matches nothing in the table
pub const DEFAULT_VOICE: VoiceProfile = VoiceProfile::Warm;

/// Deterministic voice for a brief tone
pub fn select_voice(tone: &str) -> VoiceProfile {
    let tone = tone.to_ascii_lowercase();
    TONE_VOICES
        .iter()
        .find(|(keyword, _)| tone.contains(keyword))
        .map(|(_, voice)| *voice)
        .unwrap_or(DEFAULT_VOICE)
}

/// Rhetorical wrapper for the segment's energy
///
/// High ends on "!", low trails off with "...", medium ends as a sentence.
pub fn apply_energy(text: &str, energy: EnergyTag) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let base = trimmed.trim_end_matches(|c: char| ".!?…,;:".contains(c)).trim_end();
    let base = if base.is_empty() { trimmed } else { base };

    match energy {
        EnergyTag::High => format!("{}!", base),
        EnergyTag::Low => format!("{}...", base),
        EnergyTag::Medium => {
            if trimmed.ends_with(['.', '!', '?']) {
                trimmed.to_string()
            } else {
                format!("{}.", base)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("{provider} timed out after {seconds}s")]
    Timeout { provider: &'static str, seconds: u64 },

    #[error("{provider}: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },
}

/// External text-to-speech capability
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Encoded audio (mp3) for `text`
    async fn synthesize(&self, text: &str, voice: VoiceProfile) -> Result<Vec<u8>, SpeechError>;
}

/// Per-job synthesis result, ordered by segment index
#[derive(Debug, Default)]
pub struct NarrationOutcome {
    /// `None` where both providers failed
    pub assets: Vec<Option<AudioAsset>>,
    pub failures: Vec<PipelineError>,
}

impl NarrationOutcome {
    pub fn missing_segments(&self) -> Vec<usize> {
        self.assets
            .iter()
            .enumerate()
            .filter_map(|(index, asset)| asset.is_none().then_some(index))
            .collect()
    }
}

pub struct NarrationSynthesizer {
    primary: Arc<dyn SpeechProvider>,
    fallback: Option<Arc<dyn SpeechProvider>>,
    timeout: Duration,
    max_parallel: usize,
}

impl NarrationSynthesizer {
    pub fn new(
        primary: Arc<dyn SpeechProvider>,
        fallback: Option<Arc<dyn SpeechProvider>>,
        timeout: Duration,
        max_parallel: usize,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Synthesize every segment into the workspace
    ///
    /// `on_progress(done, total)` runs after each finished segment. Provider
    /// failures leave a gap in the outcome; a workspace write failure aborts
    /// the batch with `Err`.
    pub async fn synthesize_all<F, Fut>(
        &self,
        segments: &[Segment],
        tone: &str,
        workspace: &JobWorkspace,
        mut on_progress: F,
    ) -> Result<NarrationOutcome, PipelineError>
    where
        F: FnMut(usize, usize) -> Fut,
        Fut: Future<Output = ()>,
    {
        let total = segments.len();
        let voice = select_voice(tone);
        let mut outcome = NarrationOutcome {
            assets: vec![None; total],
            failures: Vec::new(),
        };

        let calls: Vec<_> = segments
            .iter()
            .enumerate()
            .map(|(index, segment)| async move {
                (index, self.synthesize_segment(index, segment, voice, workspace).await)
            })
            .collect();
        let mut results = stream::iter(calls).buffer_unordered(self.max_parallel);

        let mut done = 0;
        while let Some((index, result)) = results.next().await {
            done += 1;
            match result {
                Ok(asset) => outcome.assets[index] = Some(asset),
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(segment = index, error = %e, "Narration unavailable; segment will be silent");
                    outcome.failures.push(e);
                }
                Err(e) => {
                    tracing::error!(segment = index, error = %e, "Narration aborted");
                    return Err(e);
                }
            }
            on_progress(done, total).await;
        }

        outcome.failures.sort_by_key(|e| match e {
            PipelineError::Synthesis { segment, .. } => *segment,
            _ => usize::MAX,
        });
        Ok(outcome)
    }

    async fn synthesize_segment(
        &self,
        index: usize,
        segment: &Segment,
        voice: VoiceProfile,
        workspace: &JobWorkspace,
    ) -> Result<AudioAsset, PipelineError> {
        let text = apply_energy(&segment.text, segment.energy);
        if text.is_empty() {
            return Err(PipelineError::Synthesis {
                segment: index,
                message: "segment has no text".to_string(),
            });
        }

        let (bytes, provider) = match self.call(self.primary.as_ref(), &text, voice).await {
            Ok(bytes) => (bytes, self.primary.name()),
            Err(primary_err) => {
                let Some(fallback) = &self.fallback else {
                    return Err(PipelineError::Synthesis {
                        segment: index,
                        message: primary_err.to_string(),
                    });
                };
                tracing::warn!(
                    segment = index,
                    error = %primary_err,
                    fallback = fallback.name(),
                    "Primary speech provider failed; trying fallback"
                );
                match self.call(fallback.as_ref(), &text, voice).await {
                    Ok(bytes) => (bytes, fallback.name()),
                    Err(fallback_err) => {
                        return Err(PipelineError::Synthesis {
                            segment: index,
                            message: format!("{}; {}", primary_err, fallback_err),
                        })
                    }
                }
            }
        };

        let path = workspace.write_segment_audio(index, &bytes).await?;
        tracing::debug!(segment = index, provider, bytes = bytes.len(), "Segment narrated");

        Ok(AudioAsset {
            segment_index: index,
            path,
            provider: provider.to_string(),
            duration: segment.duration,
            approximate: true,
        })
    }

    async fn call(
        &self,
        provider: &dyn SpeechProvider,
        text: &str,
        voice: VoiceProfile,
    ) -> Result<Vec<u8>, SpeechError> {
        match tokio::time::timeout(self.timeout, provider.synthesize(text, voice)).await {
            Ok(Ok(bytes)) if bytes.is_empty() => Err(SpeechError::Provider {
                provider: provider.name(),
                message: "empty audio".to_string(),
            }),
            Ok(result) => result,
            Err(_) => Err(SpeechError::Timeout {
                provider: provider.name(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}
