//! Data models for reel-gen
//!
//! Brief → SegmentPlan → AudioAsset / CaptionChunk → CompositionGraph, plus
//! the Job record owned by the registry.

pub mod brief;
pub mod composition;
pub mod job;
pub mod media;
pub mod plan;

pub use brief::Brief;
pub use composition::{
    AudioEntry, AudioTrackPlan, Canvas, CaptionOverlay, CompositionGraph, SceneEffect, SceneNode,
    SceneSource, TransitionEdge, TransitionKind,
};
pub use job::{Job, JobExtras, JobStatus, JobView};
pub use media::{AudioAsset, CaptionChunk, TranscriptWord};
pub use plan::{EnergyTag, Segment, SegmentPlan};
