//! Fake providers implementing the pipeline's service traits

use async_trait::async_trait;
use reel_gen::error::PipelineError;
use reel_gen::models::{Brief, EnergyTag, Segment, SegmentPlan};
use reel_gen::services::{
    DurationProbe, EncodeRequest, EncoderBackend, EncoderRun, PlanGenerator, ProbeError,
    SpeechError, SpeechProvider, VoiceProfile,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Returns the same candidate plan for every brief
pub struct ScriptedPlanner {
    segments: Vec<(String, f64, EnergyTag)>,
}

impl ScriptedPlanner {
    pub fn new(segments: &[(&str, f64)]) -> Self {
        Self {
            segments: segments
                .iter()
                .map(|(text, duration)| (text.to_string(), *duration, EnergyTag::Medium))
                .collect(),
        }
    }

    /// Candidate plan that never parses into segments
    pub fn empty() -> Self {
        Self { segments: vec![] }
    }
}

#[async_trait]
impl PlanGenerator for ScriptedPlanner {
    async fn generate(&self, _brief: &Brief) -> Result<SegmentPlan, PipelineError> {
        if self.segments.is_empty() {
            return Err(PipelineError::Planning(
                "planner returned no segments".to_string(),
            ));
        }
        Ok(SegmentPlan::new(
            self.segments
                .iter()
                .map(|(text, duration, energy)| Segment {
                    text: text.clone(),
                    duration: *duration,
                    energy: *energy,
                    visual_style: "bold".to_string(),
                })
                .collect(),
        ))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Blocks in `generate` until released; keeps a job's admission slot busy
pub struct GatedPlanner {
    inner: ScriptedPlanner,
    gate: Arc<Notify>,
}

impl GatedPlanner {
    pub fn new(inner: ScriptedPlanner) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Self {
                inner,
                gate: gate.clone(),
            },
            gate,
        )
    }
}

#[async_trait]
impl PlanGenerator for GatedPlanner {
    async fn generate(&self, brief: &Brief) -> Result<SegmentPlan, PipelineError> {
        self.gate.notified().await;
        self.inner.generate(brief).await
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

/// Speech provider that writes the spoken text as the "audio" bytes
///
/// Fails for every text containing `fail_marker`.
pub struct FakeSpeech {
    name: &'static str,
    fail_marker: Option<&'static str>,
    calls: AtomicUsize,
}

impl FakeSpeech {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fail_marker: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(name: &'static str, marker: &'static str) -> Self {
        Self {
            name,
            fail_marker: Some(marker),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechProvider for FakeSpeech {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn synthesize(&self, text: &str, _voice: VoiceProfile) -> Result<Vec<u8>, SpeechError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = self.fail_marker {
            if text.contains(marker) {
                return Err(SpeechError::Provider {
                    provider: self.name,
                    message: "HTTP 500: upstream unavailable".to_string(),
                });
            }
        }
        Ok(text.as_bytes().to_vec())
    }
}

/// Answers slower than any sane narration timeout
pub struct StalledSpeech {
    name: &'static str,
    delay: Duration,
}

impl StalledSpeech {
    pub fn new(name: &'static str, delay: Duration) -> Self {
        Self { name, delay }
    }
}

#[async_trait]
impl SpeechProvider for StalledSpeech {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn synthesize(&self, text: &str, _voice: VoiceProfile) -> Result<Vec<u8>, SpeechError> {
        tokio::time::sleep(self.delay).await;
        Ok(text.as_bytes().to_vec())
    }
}

/// Deletes every job workspace under `work_root` before answering, so the
/// narration write that follows hits a missing directory
pub struct WorkspaceWipingSpeech {
    work_root: Mutex<Option<PathBuf>>,
}

impl WorkspaceWipingSpeech {
    pub fn new() -> Self {
        Self {
            work_root: Mutex::new(None),
        }
    }

    pub fn wipe_under(&self, work_root: PathBuf) {
        *self.work_root.lock().unwrap() = Some(work_root);
    }
}

#[async_trait]
impl SpeechProvider for WorkspaceWipingSpeech {
    fn name(&self) -> &'static str {
        "wiping"
    }

    async fn synthesize(&self, text: &str, _voice: VoiceProfile) -> Result<Vec<u8>, SpeechError> {
        let root = self.work_root.lock().unwrap().clone();
        if let Some(root) = root {
            if let Ok(entries) = std::fs::read_dir(&root) {
                for entry in entries.flatten() {
                    let _ = std::fs::remove_dir_all(entry.path());
                }
            }
        }
        Ok(text.as_bytes().to_vec())
    }
}

/// Reports 2.5 spoken words per second of "audio" written by [`FakeSpeech`]
pub struct WordRateProbe;

pub const FAKE_WORDS_PER_SECOND: f64 = 2.5;

#[async_trait]
impl DurationProbe for WordRateProbe {
    async fn probe(&self, path: &Path) -> Result<f64, ProbeError> {
        let text = tokio::fs::read_to_string(path).await?;
        let words = text.split_whitespace().count();
        if words == 0 {
            return Err(ProbeError::Parse("empty audio".to_string()));
        }
        Ok((words as f64 / FAKE_WORDS_PER_SECOND).max(1.0))
    }
}

/// What the encoder saw
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub inputs: Vec<PathBuf>,
    /// Every input existed when the encoder ran
    pub inputs_present: bool,
    pub filter_graph: String,
    pub output: PathBuf,
    pub duration: f64,
}

/// Encoder double: records requests, writes a tiny file on success
pub struct RecordingEncoder {
    exit_code: i32,
    stderr: String,
    runs: Mutex<Vec<RecordedRun>>,
}

impl RecordingEncoder {
    pub fn succeeding() -> Self {
        Self {
            exit_code: 0,
            stderr: "frame=  450 fps=120 q=-1.0 Lsize=    812kB time=00:00:15.00\n".to_string(),
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(exit_code: i32, stderr: &str) -> Self {
        Self {
            exit_code,
            stderr: stderr.to_string(),
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl EncoderBackend for RecordingEncoder {
    async fn encode(&self, request: &EncodeRequest) -> std::io::Result<EncoderRun> {
        self.runs.lock().unwrap().push(RecordedRun {
            inputs: request.inputs.clone(),
            inputs_present: request.inputs.iter().all(|p| p.exists()),
            filter_graph: request.filter_graph.clone(),
            output: request.output.clone(),
            duration: request.duration,
        });

        if self.exit_code == 0 {
            tokio::fs::write(&request.output, b"\x00\x00\x00\x18ftypmp42isom").await?;
        }
        Ok(EncoderRun {
            exit_code: Some(self.exit_code),
            success: self.exit_code == 0,
            stderr: self.stderr.clone(),
        })
    }
}

/// [`WordRateProbe`] that cannot read one segment's audio
pub struct FailingProbe {
    segment_index: usize,
}

impl FailingProbe {
    pub fn for_segment(segment_index: usize) -> Self {
        Self { segment_index }
    }
}

#[async_trait]
impl DurationProbe for FailingProbe {
    async fn probe(&self, path: &Path) -> Result<f64, ProbeError> {
        let broken = format!("segment_{}.mp3", self.segment_index);
        if path.file_name().is_some_and(|name| name == broken.as_str()) {
            return Err(ProbeError::Parse("no duration in ffprobe output".to_string()));
        }
        WordRateProbe.probe(path).await
    }
}
