//! Declarative composition graph handed to the encoder
//!
//! Times are seconds on the global output timeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::plan::EnergyTag;

/// Output frame geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Visual source of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneSource {
    /// Animated two-color gradient (colors as `0xRRGGBB`)
    Gradient { from: String, to: String },
}

/// Camera effect applied to a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneEffect {
    SlowZoom,
    DriftPan,
    PunchZoom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub index: usize,
    pub segment_index: usize,
    pub source: SceneSource,
    /// Nominal duration on the output timeline
    pub duration: f64,
    /// Extra time rendered before the nominal start, overlapped by the incoming transition
    pub lead_in: f64,
    pub effect: SceneEffect,
}

impl SceneNode {
    /// Length of the rendered clip (nominal + lead-in)
    pub fn render_duration(&self) -> f64 {
        self.duration + self.lead_in
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Fade,
    SlideLeft,
    WipeUp,
}

impl TransitionKind {
    /// ffmpeg `xfade` transition name
    pub fn as_ffmpeg(self) -> &'static str {
        match self {
            TransitionKind::Fade => "fade",
            TransitionKind::SlideLeft => "slideleft",
            TransitionKind::WipeUp => "wipeup",
        }
    }
}

/// Timed blend between scene `from` and scene `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEdge {
    pub from: usize,
    pub to: usize,
    pub kind: TransitionKind,
    pub duration: f64,
    /// Start of the blend on the global timeline
    pub offset: f64,
}

/// Caption drawn while `start <= t < end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionOverlay {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub energy: EnergyTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioEntry {
    Asset {
        segment_index: usize,
        path: PathBuf,
        duration: f64,
    },
    /// Placeholder for a segment whose narration failed
    Silence { segment_index: usize, duration: f64 },
}

impl AudioEntry {
    pub fn duration(&self) -> f64 {
        match self {
            AudioEntry::Asset { duration, .. } | AudioEntry::Silence { duration, .. } => *duration,
        }
    }

    pub fn segment_index(&self) -> usize {
        match self {
            AudioEntry::Asset { segment_index, .. } | AudioEntry::Silence { segment_index, .. } => {
                *segment_index
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            AudioEntry::Asset { path, .. } => Some(path),
            AudioEntry::Silence { .. } => None,
        }
    }

    pub fn is_silence(&self) -> bool {
        matches!(self, AudioEntry::Silence { .. })
    }
}

/// Ordered concatenation of narration assets and silence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioTrackPlan {
    pub entries: Vec<AudioEntry>,
}

impl AudioTrackPlan {
    pub fn total_duration(&self) -> f64 {
        self.entries.iter().map(AudioEntry::duration).sum()
    }

    /// Audio files in entry order (encoder `-i` inputs)
    pub fn asset_paths(&self) -> Vec<&Path> {
        self.entries.iter().filter_map(AudioEntry::path).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionGraph {
    pub canvas: Canvas,
    pub scenes: Vec<SceneNode>,
    pub transitions: Vec<TransitionEdge>,
    pub captions: Vec<CaptionOverlay>,
    pub audio: AudioTrackPlan,
}

impl CompositionGraph {
    /// Visual timeline length (sum of nominal scene durations)
    pub fn total_duration(&self) -> f64 {
        self.scenes.iter().map(|s| s.duration).sum()
    }
}
