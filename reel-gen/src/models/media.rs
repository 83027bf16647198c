//! Narration audio and caption timing types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::plan::EnergyTag;

/// Rendered narration for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAsset {
    pub segment_index: usize,
    /// Audio file inside the job workspace
    pub path: PathBuf,
    /// Provider that produced the audio ("openai", "elevenlabs")
    pub provider: String,
    /// Seconds; authoritative once probed
    pub duration: f64,
    /// Set when the probe failed and `duration` is the requested value
    pub approximate: bool,
}

/// Word-grouped caption with a global time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionChunk {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub segment_index: usize,
    pub energy: EnergyTag,
}

impl CaptionChunk {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Word with timestamps relative to the start of its audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
}
