//! Caption timeline
//!
//! Speech-rate strategy (default): a segment's words are assumed to be spoken
//! at a uniform rate across its measured duration. Chunk size targets about
//! one second of speech, bounded for readability:
//!
//! ```text
//! wps       = words / duration
//! chunk     = clamp(round(target_words_per_chunk / wps), min_words, max_words)
//! start[k]  = offset + words_before_chunk_k / wps
//! end[k]    = start[k+1]        (last end snapped to offset + duration)
//! ```
//!
//! Transcript-aligned strategy: the same chunk sizes, timed from word
//! timestamps of the rendered audio. Segments without audio, or whose
//! transcription fails, use the speech-rate timing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{CaptionConfig, CaptionStrategy};
use crate::models::{AudioAsset, CaptionChunk, EnergyTag, SegmentPlan, TranscriptWord};
use crate::services::openai_client::OpenAiClient;

#[derive(Debug, Clone, Copy)]
pub struct CaptionSettings {
    pub target_words_per_chunk: f64,
    pub min_words: usize,
    pub max_words: usize,
}

impl From<&CaptionConfig> for CaptionSettings {
    fn from(config: &CaptionConfig) -> Self {
        let min_words = config.min_words.max(1);
        Self {
            target_words_per_chunk: config.target_words_per_chunk,
            min_words,
            max_words: config.max_words.max(min_words),
        }
    }
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self::from(&CaptionConfig::default())
    }
}

/// Words per chunk for a speaking rate
pub fn chunk_size_for_rate(words_per_second: f64, settings: &CaptionSettings) -> usize {
    if !words_per_second.is_finite() || words_per_second <= 0.0 {
        return settings.max_words;
    }
    let raw = (settings.target_words_per_chunk / words_per_second).round();
    if !raw.is_finite() || raw < settings.min_words as f64 {
        settings.min_words
    } else if raw > settings.max_words as f64 {
        settings.max_words
    } else {
        raw as usize
    }
}

/// Global start offset of every segment
pub fn segment_offsets(durations: &[f64]) -> Vec<f64> {
    let mut offset = 0.0;
    durations
        .iter()
        .map(|d| {
            let start = offset;
            offset += d;
            start
        })
        .collect()
}

/// Uniform-rate chunks for one segment
pub fn speech_rate_chunks(
    segment_index: usize,
    text: &str,
    energy: EnergyTag,
    offset: f64,
    duration: f64,
    settings: &CaptionSettings,
) -> Vec<CaptionChunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }

    let words_per_second = words.len() as f64 / duration;
    let size = chunk_size_for_rate(words_per_second, settings);
    let segment_end = offset + duration;

    let mut chunks: Vec<CaptionChunk> = Vec::new();
    let mut spoken = 0usize;
    for group in words.chunks(size) {
        let start = offset + spoken as f64 / words_per_second;
        spoken += group.len();
        if let Some(previous) = chunks.last_mut() {
            previous.end = start;
        }
        chunks.push(CaptionChunk {
            text: group.join(" "),
            start,
            end: offset + spoken as f64 / words_per_second,
            segment_index,
            energy,
        });
    }

    if let Some(last) = chunks.last_mut() {
        last.end = segment_end;
    }
    chunks
}

/// Transcript-timed chunks for one segment
///
/// Word times are relative to the segment's audio file.
pub fn aligned_chunks(
    segment_index: usize,
    words: &[TranscriptWord],
    energy: EnergyTag,
    offset: f64,
    duration: f64,
    settings: &CaptionSettings,
) -> Vec<CaptionChunk> {
    if words.is_empty() || !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }

    let segment_end = offset + duration;
    let size = chunk_size_for_rate(words.len() as f64 / duration, settings);

    let mut chunks: Vec<CaptionChunk> = Vec::new();
    for group in words.chunks(size) {
        let text = group
            .iter()
            .map(|w| w.word.trim())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            continue;
        }

        let floor = chunks.last().map(|c| c.start).unwrap_or(offset);
        let start = (offset + group[0].start.max(0.0)).clamp(floor, segment_end);
        let last_end = group.last().map(|w| w.end).unwrap_or(group[0].start);
        let end = (offset + last_end).clamp(start, segment_end);

        if let Some(previous) = chunks.last_mut() {
            previous.end = start;
        }
        chunks.push(CaptionChunk {
            text,
            start,
            end,
            segment_index,
            energy,
        });
    }

    if let Some(last) = chunks.last_mut() {
        last.end = segment_end;
    }
    chunks
}

/// Word-level transcription of rendered audio
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Vec<TranscriptWord>, String>;
}

/// OpenAI transcription with word timestamps
pub struct WhisperTranscriber {
    client: Arc<OpenAiClient>,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(client: Arc<OpenAiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<Vec<TranscriptWord>, String> {
        self.client
            .transcribe_words(&self.model, audio)
            .await
            .map_err(|e| e.to_string())
    }
}

pub struct CaptionTimelineBuilder {
    settings: CaptionSettings,
    strategy: CaptionStrategy,
    transcriber: Option<Arc<dyn Transcriber>>,
}

impl CaptionTimelineBuilder {
    pub fn new(
        settings: CaptionSettings,
        strategy: CaptionStrategy,
        transcriber: Option<Arc<dyn Transcriber>>,
    ) -> Self {
        if strategy == CaptionStrategy::TranscriptAligned && transcriber.is_none() {
            tracing::warn!("Transcript-aligned captions selected without a transcriber; speech-rate timing will be used per segment");
        }
        Self {
            settings,
            strategy,
            transcriber,
        }
    }

    pub fn speech_rate(settings: CaptionSettings) -> Self {
        Self::new(settings, CaptionStrategy::SpeechRate, None)
    }

    pub fn strategy(&self) -> CaptionStrategy {
        self.strategy
    }

    /// Caption timeline for the whole plan
    ///
    /// `durations` are the per-segment timeline durations (measured where
    /// available).
    pub async fn build(
        &self,
        plan: &SegmentPlan,
        durations: &[f64],
        assets: &[Option<AudioAsset>],
    ) -> Vec<CaptionChunk> {
        let offsets = segment_offsets(durations);
        let mut timeline = Vec::new();

        for (index, segment) in plan.segments.iter().enumerate() {
            let (Some(&offset), Some(&duration)) = (offsets.get(index), durations.get(index)) else {
                break;
            };

            let audio: Option<PathBuf> = assets
                .get(index)
                .and_then(Option::as_ref)
                .map(|a| a.path.clone());

            let aligned = match (self.strategy, &self.transcriber, audio) {
                (CaptionStrategy::TranscriptAligned, Some(transcriber), Some(path)) => {
                    match transcriber.transcribe(&path).await {
                        Ok(words) => Some(aligned_chunks(
                            index,
                            &words,
                            segment.energy,
                            offset,
                            duration,
                            &self.settings,
                        )),
                        Err(e) => {
                            tracing::warn!(
                                segment = index,
                                error = %e,
                                "Transcription failed; using speech-rate captions"
                            );
                            None
                        }
                    }
                }
                _ => None,
            };

            let chunks = match aligned {
                Some(chunks) if !chunks.is_empty() => chunks,
                _ => speech_rate_chunks(
                    index,
                    &segment.text,
                    segment.energy,
                    offset,
                    duration,
                    &self.settings,
                ),
            };
            timeline.extend(chunks);
        }

        timeline
    }
}
