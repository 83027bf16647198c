//! Segment plan produced by the planner and shaped by the normalizer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery energy of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnergyTag {
    Low,
    #[default]
    Medium,
    High,
}

impl EnergyTag {
    /// Parse planner output; anything unrecognized is `Medium`
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "calm" | "soft" => EnergyTag::Low,
            "high" | "energetic" | "intense" => EnergyTag::High,
            _ => EnergyTag::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnergyTag::Low => "low",
            EnergyTag::Medium => "medium",
            EnergyTag::High => "high",
        }
    }
}

impl fmt::Display for EnergyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One narrated portion of the video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    /// Requested duration in seconds
    pub duration: f64,
    pub energy: EnergyTag,
    pub visual_style: String,
}

/// Ordered list of segments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentPlan {
    pub segments: Vec<Segment>,
}

impl SegmentPlan {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    pub fn durations(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.duration).collect()
    }
}
