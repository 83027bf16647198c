//! Segment count tiers and duration rescaling
//!
//! Planner output is untrusted: counts may exceed what the target duration
//! supports and durations may be zero, negative, NaN or not sum to the
//! target. The normalizer enforces:
//!
//! 1. segment count ≤ tier maximum for the target (merging excess segments)
//! 2. each duration clamped into `[min_segment, max_segment]`
//! 3. proportional rescale so the durations sum to the target

use crate::config::NormalizerConfig;
use crate::error::PipelineError;
use crate::models::{Segment, SegmentPlan};

/// Maximum number of segments for a target duration (seconds)
pub fn tier_max_segments(target: f64) -> usize {
    if target <= 15.0 {
        2
    } else if target <= 30.0 {
        3
    } else {
        4
    }
}

#[derive(Debug, Clone)]
pub struct DurationNormalizer {
    min_segment: f64,
    max_segment: f64,
}

impl Default for DurationNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

impl DurationNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        let min_segment = config.min_segment_secs.max(0.0);
        let max_segment = config.max_segment_secs.max(min_segment);
        Self {
            min_segment,
            max_segment,
        }
    }

    /// Shape a candidate plan to the target duration
    pub fn normalize(&self, target: f64, plan: SegmentPlan) -> Result<SegmentPlan, PipelineError> {
        if plan.is_empty() {
            return Err(PipelineError::Planning("plan contains no segments".to_string()));
        }
        if !target.is_finite() || target <= 0.0 {
            return Err(PipelineError::Planning(format!(
                "invalid target duration: {}",
                target
            )));
        }

        let max_segments = tier_max_segments(target);
        let proposed = plan.len();
        let mut segments = merge_into_groups(plan.segments, max_segments);
        if segments.len() < proposed {
            tracing::info!(
                proposed,
                kept = segments.len(),
                target,
                "Merged excess segments to satisfy tier limit"
            );
        }

        for segment in &mut segments {
            segment.duration = self.clamp(segment.duration);
        }

        let durations: Vec<f64> = segments.iter().map(|s| s.duration).collect();
        let rescaled = rescale(&durations, target);
        for (segment, duration) in segments.iter_mut().zip(rescaled) {
            segment.duration = duration;
        }

        Ok(SegmentPlan::new(segments))
    }

    fn clamp(&self, duration: f64) -> f64 {
        if duration.is_nan() {
            return self.min_segment;
        }
        duration.clamp(self.min_segment, self.max_segment)
    }
}

/// Partition segments into at most `max_groups` contiguous groups
///
/// Earlier groups take the remainder. A merged segment joins the texts,
/// sums the durations and keeps the first member's energy and style.
fn merge_into_groups(segments: Vec<Segment>, max_groups: usize) -> Vec<Segment> {
    let count = segments.len();
    if count <= max_groups || max_groups == 0 {
        return segments;
    }

    let base = count / max_groups;
    let remainder = count % max_groups;
    let mut iter = segments.into_iter();
    let mut merged = Vec::with_capacity(max_groups);

    for group in 0..max_groups {
        let size = base + usize::from(group < remainder);
        let members: Vec<Segment> = iter.by_ref().take(size).collect();
        let Some(first) = members.first() else {
            break;
        };

        let text = members
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let duration = members
            .iter()
            .map(|s| if s.duration.is_finite() { s.duration.max(0.0) } else { s.duration })
            .sum();

        merged.push(Segment {
            text,
            duration,
            energy: first.energy,
            visual_style: first.visual_style.clone(),
        });
    }

    merged
}

/// Scale durations so they sum to `target`; equal split when the sum is zero
///
/// The last duration absorbs floating drift.
fn rescale(durations: &[f64], target: f64) -> Vec<f64> {
    let n = durations.len();
    if n == 0 {
        return Vec::new();
    }

    let sum: f64 = durations.iter().sum();
    let mut scaled: Vec<f64> = if sum > 0.0 && sum.is_finite() {
        durations.iter().map(|d| d * target / sum).collect()
    } else {
        vec![target / n as f64; n]
    };

    let head: f64 = scaled[..n - 1].iter().sum();
    scaled[n - 1] = target - head;
    scaled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EnergyTag;

    fn seg(text: &str, duration: f64, energy: EnergyTag) -> Segment {
        Segment {
            text: text.to_string(),
            duration,
            energy,
            visual_style: "bold".to_string(),
        }
    }

    fn plan(durations: &[f64]) -> SegmentPlan {
        SegmentPlan::new(
            durations
                .iter()
                .enumerate()
                .map(|(i, d)| seg(&format!("part {}", i), *d, EnergyTag::Medium))
                .collect(),
        )
    }

    #[test]
    fn test_tiers() {
        assert_eq!(tier_max_segments(5.0), 2);
        assert_eq!(tier_max_segments(15.0), 2);
        assert_eq!(tier_max_segments(15.5), 3);
        assert_eq!(tier_max_segments(30.0), 3);
        assert_eq!(tier_max_segments(31.0), 4);
        assert_eq!(tier_max_segments(120.0), 4);
    }

    #[test]
    fn test_fifteen_seconds_five_segments_collapse_to_two() {
        let normalizer = DurationNormalizer::default();
        let result = normalizer.normalize(15.0, plan(&[3.0; 5])).unwrap();

        assert_eq!(result.len(), 2);
        assert!((result.total_duration() - 15.0).abs() < 1e-3);
        assert_eq!(result.segments[0].text, "part 0 part 1 part 2");
        assert_eq!(result.segments[1].text, "part 3 part 4");
    }

    #[test]
    fn test_merged_segment_keeps_first_energy() {
        let normalizer = DurationNormalizer::default();
        let input = SegmentPlan::new(vec![
            seg("a", 3.0, EnergyTag::High),
            seg("b", 3.0, EnergyTag::Low),
            seg("c", 3.0, EnergyTag::Low),
        ]);
        let result = normalizer.normalize(10.0, input).unwrap();
        assert_eq!(result.segments[0].energy, EnergyTag::High);
        assert_eq!(result.segments[1].energy, EnergyTag::Low);
    }

    #[test]
    fn test_zero_negative_and_nan_durations_are_clamped() {
        let normalizer = DurationNormalizer::default();
        let result = normalizer
            .normalize(20.0, plan(&[0.0, -4.0, f64::NAN]))
            .unwrap();
        assert_eq!(result.len(), 3);
        assert!((result.total_duration() - 20.0).abs() < 1e-3);
        for s in &result.segments {
            assert!((s.duration - 20.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_oversized_duration_clamped_before_rescale() {
        let normalizer = DurationNormalizer::default();
        let result = normalizer.normalize(30.0, plan(&[1000.0, 10.0])).unwrap();
        // 1000 → 20, then 20:10 scaled to 30
        assert!((result.segments[0].duration - 20.0).abs() < 1e-6);
        assert!((result.segments[1].duration - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_minimum_falls_back_to_equal_split() {
        let normalizer = DurationNormalizer::new(&NormalizerConfig {
            min_segment_secs: 0.0,
            max_segment_secs: 20.0,
        });
        let result = normalizer.normalize(12.0, plan(&[0.0, 0.0])).unwrap();
        assert_eq!(result.durations(), vec![6.0, 6.0]);
    }

    #[test]
    fn test_empty_plan_is_planning_error() {
        let normalizer = DurationNormalizer::default();
        let result = normalizer.normalize(15.0, SegmentPlan::default());
        assert!(matches!(result, Err(PipelineError::Planning(_))));
    }

    #[test]
    fn test_count_and_sum_hold_across_targets() {
        let normalizer = DurationNormalizer::default();
        let candidates: [&[f64]; 5] = [
            &[1.0],
            &[3.0, 0.5, 7.25],
            &[9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0],
            &[0.1, 100.0, -3.0, 4.0, f64::INFINITY],
            &[2.5; 12],
        ];

        let mut target = 5.0;
        while target <= 120.0 {
            for durations in candidates {
                let result = normalizer.normalize(target, plan(durations)).unwrap();
                assert!(
                    result.len() <= tier_max_segments(target),
                    "count {} exceeds tier for {}",
                    result.len(),
                    target
                );
                assert!(
                    (result.total_duration() - target).abs() < 1e-3,
                    "sum {} != {}",
                    result.total_duration(),
                    target
                );
            }
            target += 0.75;
        }
    }
}
