//! Scene compiler
//!
//! Builds the composition graph from the normalized plan, the timeline
//! durations, the caption timeline and the narration assets.
//!
//! Timeline model: scene `j` starts at `C_j`, the sum of the nominal
//! durations before it. The transition into scene `j` starts at
//! `C_j - td` and scene `j` is rendered with a lead-in of `td`, so the
//! visual track is exactly `Σ duration` long and matches the audio.

use crate::config::{CompositionConfig, SceneMode};
use crate::error::PipelineError;
use crate::models::{
    AudioAsset, AudioEntry, AudioTrackPlan, Canvas, CaptionChunk, CaptionOverlay,
    CompositionGraph, EnergyTag, SceneEffect, SceneNode, SceneSource, SegmentPlan,
    TransitionEdge, TransitionKind,
};

/// Shortest sub-scene produced by dynamic mode (seconds)
pub const MIN_SUBSCENE_SECS: f64 = 1.0;
/// Transition between sub-scenes of the same segment (seconds)
pub const SUBSCENE_TRANSITION_SECS: f64 = 0.25;

/// Visual style → gradient colors
const STYLE_PALETTE: &[(&str, &str, &str)] = &[
    ("bold", "0xff3d00", "0x1a1a2e"),
    ("warm", "0xf7971e", "0xffd200"),
    ("calm", "0x2193b0", "0x6dd5ed"),
    ("tech", "0x0f2027", "0x2c5364"),
    ("luxury", "0x141414", "0xb8860b"),
    ("playful", "0xff6a88", "0xff99ac"),
];
const DEFAULT_GRADIENT: (&str, &str) = ("0x4b6cb7", "0x182848");

pub fn gradient_for_style(style: &str) -> SceneSource {
    let style = style.trim().to_ascii_lowercase();
    let (from, to) = STYLE_PALETTE
        .iter()
        .find(|(name, _, _)| *name == style)
        .map(|(_, from, to)| (*from, *to))
        .unwrap_or(DEFAULT_GRADIENT);
    SceneSource::Gradient {
        from: from.to_string(),
        to: to.to_string(),
    }
}

pub fn effect_for_energy(energy: EnergyTag) -> SceneEffect {
    match energy {
        EnergyTag::Low => SceneEffect::SlowZoom,
        EnergyTag::Medium => SceneEffect::DriftPan,
        EnergyTag::High => SceneEffect::PunchZoom,
    }
}

/// Transition into a scene of the given energy
pub fn transition_for_energy(energy: EnergyTag) -> TransitionKind {
    match energy {
        EnergyTag::Low => TransitionKind::Fade,
        EnergyTag::Medium => TransitionKind::SlideLeft,
        EnergyTag::High => TransitionKind::WipeUp,
    }
}

#[derive(Debug, Clone)]
pub struct SceneCompiler {
    canvas: Canvas,
    transition_secs: f64,
    mode: SceneMode,
}

impl SceneCompiler {
    pub fn new(config: &CompositionConfig) -> Self {
        Self {
            canvas: Canvas {
                width: config.width,
                height: config.height,
                fps: config.fps.max(1),
            },
            transition_secs: if config.transition_secs.is_finite() {
                config.transition_secs.max(0.0)
            } else {
                0.0
            },
            mode: config.scene_mode,
        }
    }

    pub fn compile(
        &self,
        plan: &SegmentPlan,
        durations: &[f64],
        captions: &[CaptionChunk],
        assets: &[Option<AudioAsset>],
    ) -> Result<CompositionGraph, PipelineError> {
        if plan.is_empty() {
            return Err(PipelineError::Compilation("plan has no segments".to_string()));
        }
        if durations.len() != plan.len() {
            return Err(PipelineError::Compilation(format!(
                "{} durations for {} segments",
                durations.len(),
                plan.len()
            )));
        }
        if let Some((index, d)) = durations
            .iter()
            .enumerate()
            .find(|(_, d)| !d.is_finite() || **d <= 0.0)
        {
            return Err(PipelineError::Compilation(format!(
                "segment {} has invalid duration {}",
                index + 1,
                d
            )));
        }

        let mut scenes = self.build_scenes(plan, durations, captions);
        let transitions = self.link_scenes(&mut scenes, plan);
        let overlays = captions
            .iter()
            .map(|chunk| CaptionOverlay {
                text: chunk.text.clone(),
                start: chunk.start,
                end: chunk.end,
                energy: chunk.energy,
            })
            .collect();
        let audio = audio_track(durations, assets);

        let graph = CompositionGraph {
            canvas: self.canvas,
            scenes,
            transitions,
            captions: overlays,
            audio,
        };

        let drift = (graph.total_duration() - graph.audio.total_duration()).abs();
        if drift > 1e-3 {
            return Err(PipelineError::Compilation(format!(
                "video ({:.3}s) and audio ({:.3}s) lengths differ",
                graph.total_duration(),
                graph.audio.total_duration()
            )));
        }

        Ok(graph)
    }

    fn build_scenes(
        &self,
        plan: &SegmentPlan,
        durations: &[f64],
        captions: &[CaptionChunk],
    ) -> Vec<SceneNode> {
        let mut scenes = Vec::new();
        let mut offset = 0.0;

        for (segment_index, (segment, &duration)) in plan.segments.iter().zip(durations).enumerate() {
            let pieces = match self.mode {
                SceneMode::PerSegment => vec![duration],
                SceneMode::Dynamic => split_at_captions(segment_index, offset, duration, captions),
            };

            for piece in pieces {
                scenes.push(SceneNode {
                    index: scenes.len(),
                    segment_index,
                    source: gradient_for_style(&segment.visual_style),
                    duration: piece,
                    lead_in: 0.0,
                    effect: effect_for_energy(segment.energy),
                });
            }
            offset += duration;
        }

        scenes
    }

    /// Transitions between adjacent scenes; sets each incoming scene's lead-in
    fn link_scenes(&self, scenes: &mut [SceneNode], plan: &SegmentPlan) -> Vec<TransitionEdge> {
        let min_transition = 1.0 / self.canvas.fps as f64;
        let mut transitions = Vec::with_capacity(scenes.len().saturating_sub(1));
        let mut cumulative = scenes.first().map(|s| s.duration).unwrap_or(0.0);

        for j in 1..scenes.len() {
            let (prev, next) = (&scenes[j - 1], &scenes[j]);
            let same_segment = prev.segment_index == next.segment_index;
            let energy = plan
                .segments
                .get(next.segment_index)
                .map(|s| s.energy)
                .unwrap_or_default();

            let (mut kind, requested) = if same_segment {
                (TransitionKind::Fade, self.transition_secs.min(SUBSCENE_TRANSITION_SECS))
            } else {
                (transition_for_energy(energy), self.transition_secs)
            };
            let ceiling = prev.duration.min(next.duration) / 2.0;
            // never shorter than one frame, never longer than what precedes it
            let duration = requested.min(ceiling).max(min_transition).min(cumulative);
            if ceiling < min_transition {
                kind = TransitionKind::Fade;
            }
            let offset = (cumulative - duration).max(0.0);

            transitions.push(TransitionEdge {
                from: prev.index,
                to: next.index,
                kind,
                duration,
                offset,
            });
            scenes[j].lead_in = duration;
            cumulative += scenes[j].duration;
        }

        transitions
    }
}

/// Sub-scene durations for one segment, cut at caption starts
///
/// Cuts closer than [`MIN_SUBSCENE_SECS`] to the previous cut or the segment
/// end are skipped.
fn split_at_captions(
    segment_index: usize,
    offset: f64,
    duration: f64,
    captions: &[CaptionChunk],
) -> Vec<f64> {
    let end = offset + duration;
    let mut cuts = vec![offset];
    for chunk in captions.iter().filter(|c| c.segment_index == segment_index) {
        let last = cuts[cuts.len() - 1];
        if chunk.start - last >= MIN_SUBSCENE_SECS && end - chunk.start >= MIN_SUBSCENE_SECS {
            cuts.push(chunk.start);
        }
    }

    let mut pieces: Vec<f64> = cuts.windows(2).map(|w| w[1] - w[0]).collect();
    let used: f64 = pieces.iter().sum();
    pieces.push(duration - used);
    pieces
}

/// Narration in segment order; silence where narration is missing
fn audio_track(durations: &[f64], assets: &[Option<AudioAsset>]) -> AudioTrackPlan {
    let entries = durations
        .iter()
        .enumerate()
        .map(|(segment_index, &duration)| match assets.get(segment_index).and_then(Option::as_ref) {
            Some(asset) => AudioEntry::Asset {
                segment_index,
                path: asset.path.clone(),
                duration,
            },
            None => AudioEntry::Silence {
                segment_index,
                duration,
            },
        })
        .collect();
    AudioTrackPlan { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Segment;
    use crate::services::caption_timeline::{CaptionSettings, CaptionTimelineBuilder};
    use std::path::PathBuf;

    fn plan(energies: &[EnergyTag], durations: &[f64]) -> SegmentPlan {
        SegmentPlan::new(
            energies
                .iter()
                .zip(durations)
                .map(|(energy, d)| Segment {
                    text: "we build rockets that land gently every single time".into(),
                    duration: *d,
                    energy: *energy,
                    visual_style: "tech".into(),
                })
                .collect(),
        )
    }

    fn assets(n: usize, missing: Option<usize>) -> Vec<Option<AudioAsset>> {
        (0..n)
            .map(|i| {
                (Some(i) != missing).then(|| AudioAsset {
                    segment_index: i,
                    path: PathBuf::from(format!("/tmp/segment_{}.mp3", i)),
                    provider: "fake".into(),
                    duration: 5.0,
                    approximate: false,
                })
            })
            .collect()
    }

    fn compiler(mode: SceneMode) -> SceneCompiler {
        SceneCompiler::new(&CompositionConfig {
            scene_mode: mode,
            ..CompositionConfig::default()
        })
    }

    #[test]
    fn test_single_scene_has_no_transitions() {
        let p = plan(&[EnergyTag::High], &[12.0]);
        let graph = compiler(SceneMode::PerSegment)
            .compile(&p, &[12.0], &[], &assets(1, None))
            .unwrap();
        assert_eq!(graph.scenes.len(), 1);
        assert!(graph.transitions.is_empty());
        assert_eq!(graph.scenes[0].lead_in, 0.0);
        assert_eq!(graph.scenes[0].effect, SceneEffect::PunchZoom);
    }

    #[test]
    fn test_transition_offsets_bounded_by_cumulative() {
        let energies = [EnergyTag::Low, EnergyTag::Medium, EnergyTag::High, EnergyTag::Low];
        let durations = [4.0, 0.6, 7.5, 3.0];
        let p = plan(&energies, &durations);
        let graph = compiler(SceneMode::PerSegment)
            .compile(&p, &durations, &[], &assets(4, None))
            .unwrap();

        assert_eq!(graph.transitions.len(), 3);
        let mut cumulative = 0.0;
        for (edge, scene) in graph.transitions.iter().zip(&graph.scenes) {
            cumulative += scene.duration;
            assert!(edge.offset >= 0.0);
            assert!(edge.offset <= cumulative + 1e-9);
            assert!((edge.offset + edge.duration - cumulative).abs() < 1e-9);
        }
        // the 0.6s scene caps both neighbouring transitions at 0.3s
        assert!((graph.transitions[0].duration - 0.3).abs() < 1e-9);
        assert!((graph.transitions[1].duration - 0.3).abs() < 1e-9);
        assert_eq!(graph.transitions[0].kind, TransitionKind::SlideLeft);
        assert_eq!(graph.transitions[1].kind, TransitionKind::WipeUp);
        assert_eq!(graph.transitions[2].kind, TransitionKind::Fade);
        assert_eq!(graph.scenes[1].lead_in, graph.transitions[0].duration);
    }

    #[test]
    fn test_sub_frame_scene_gets_one_frame_fade() {
        // at 30fps one frame is 0.0333s; half of a 0.04s scene is below that
        let durations = [3.0, 0.04, 3.0];
        let p = plan(&[EnergyTag::Low, EnergyTag::High, EnergyTag::Medium], &durations);
        let graph = compiler(SceneMode::PerSegment)
            .compile(&p, &durations, &[], &assets(3, None))
            .unwrap();

        let frame = 1.0 / 30.0;
        assert_eq!(graph.transitions.len(), 2);
        for edge in &graph.transitions {
            assert!((edge.duration - frame).abs() < 1e-9);
            assert_eq!(edge.kind, TransitionKind::Fade);
            assert!(format!("{:.3}", edge.duration) != "0.000");
        }
        assert!((graph.transitions[1].offset - (3.04 - frame)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_asset_becomes_matching_silence() {
        let durations = [5.0, 4.2, 5.8];
        let p = plan(&[EnergyTag::Medium; 3], &durations);
        let graph = compiler(SceneMode::PerSegment)
            .compile(&p, &durations, &[], &assets(3, Some(1)))
            .unwrap();

        let entry = &graph.audio.entries[1];
        assert!(entry.is_silence());
        assert_eq!(entry.duration(), 4.2);
        assert!((graph.audio.total_duration() - graph.total_duration()).abs() < 1e-9);
        assert_eq!(graph.audio.asset_paths().len(), 2);
    }

    #[tokio::test]
    async fn test_dynamic_mode_splits_at_captions() {
        let durations = [8.0, 6.0];
        let p = plan(&[EnergyTag::High, EnergyTag::Low], &durations);
        let captions = CaptionTimelineBuilder::speech_rate(CaptionSettings::default())
            .build(&p, &durations, &assets(2, None))
            .await;

        let graph = compiler(SceneMode::Dynamic)
            .compile(&p, &durations, &captions, &assets(2, None))
            .unwrap();

        assert!(graph.scenes.len() > 2);
        for segment in 0..2 {
            let total: f64 = graph
                .scenes
                .iter()
                .filter(|s| s.segment_index == segment)
                .map(|s| s.duration)
                .sum();
            assert!((total - durations[segment]).abs() < 1e-9);
        }
        assert!(graph.scenes.iter().all(|s| s.duration >= MIN_SUBSCENE_SECS - 1e-9));
        assert_eq!(graph.captions.len(), captions.len());
        assert_eq!(graph.captions[0].start, captions[0].start);
    }

    #[test]
    fn test_invalid_inputs_are_compilation_errors() {
        let p = plan(&[EnergyTag::Low, EnergyTag::Low], &[5.0, 5.0]);
        let c = compiler(SceneMode::PerSegment);
        assert!(matches!(
            c.compile(&p, &[5.0], &[], &[]),
            Err(PipelineError::Compilation(_))
        ));
        assert!(matches!(
            c.compile(&p, &[5.0, f64::NAN], &[], &[]),
            Err(PipelineError::Compilation(_))
        ));
        assert!(matches!(
            c.compile(&SegmentPlan::default(), &[], &[], &[]),
            Err(PipelineError::Compilation(_))
        ));
    }

    #[test]
    fn test_palette_default() {
        assert_eq!(
            gradient_for_style("unknown"),
            SceneSource::Gradient {
                from: DEFAULT_GRADIENT.0.into(),
                to: DEFAULT_GRADIENT.1.into()
            }
        );
    }
}
