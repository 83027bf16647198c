//! Plan generation
//!
//! The planner proposes segments; the normalizer makes them fit. A plan that
//! is not a list, is empty, or has a non-positive duration fails the stage.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::models::{Brief, EnergyTag, Segment, SegmentPlan};
use crate::services::openai_client::OpenAiClient;

/// Visual style used when the planner omits one
pub const DEFAULT_VISUAL_STYLE: &str = "default";

#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Candidate plan for the brief (not yet normalized)
    async fn generate(&self, brief: &Brief) -> Result<SegmentPlan, PipelineError>;

    fn name(&self) -> &'static str;
}

const SYSTEM_PROMPT: &str = "You write scripts for vertical short-form brand videos. \
Reply with a JSON object {\"segments\": [{\"text\": string, \"duration\": number, \
\"energyTag\": \"low\"|\"medium\"|\"high\", \"visualStyleTag\": string}]}. \
Durations are seconds of narration. Keep each segment one or two spoken sentences. \
visualStyleTag is one of: bold, warm, calm, tech, luxury, playful.";

/// Chat-completion backed planner
pub struct OpenAiPlanGenerator {
    client: Arc<OpenAiClient>,
    model: String,
}

impl OpenAiPlanGenerator {
    pub fn new(client: Arc<OpenAiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl PlanGenerator for OpenAiPlanGenerator {
    async fn generate(&self, brief: &Brief) -> Result<SegmentPlan, PipelineError> {
        let prompt = user_prompt(brief);
        let raw = self
            .client
            .chat_json(&self.model, SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| PipelineError::Planning(format!("planner request failed: {}", e)))?;

        parse_plan_response(&raw)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

fn user_prompt(brief: &Brief) -> String {
    let mut prompt = format!(
        "Brand: {}\nDescription: {}\nTarget duration: {} seconds\n",
        brief.brand_name, brief.description, brief.target_duration
    );
    if !brief.audience.trim().is_empty() {
        prompt.push_str(&format!("Audience: {}\n", brief.audience));
    }
    if !brief.tone.trim().is_empty() {
        prompt.push_str(&format!("Tone: {}\n", brief.tone));
    }
    if !brief.call_to_action.trim().is_empty() {
        prompt.push_str(&format!("Call to action: {}\n", brief.call_to_action));
    }
    prompt
}

/// Parse planner output into a candidate plan
///
/// Accepts `{"segments": [...]}` or a bare array, optionally wrapped in a
/// markdown code fence.
pub fn parse_plan_response(raw: &str) -> Result<SegmentPlan, PipelineError> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| PipelineError::Planning(format!("plan is not valid JSON: {}", e)))?;

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("segments") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(PipelineError::Planning(
                    "plan has no segments list".to_string(),
                ))
            }
        },
        _ => return Err(PipelineError::Planning("plan is not a list".to_string())),
    };

    if items.is_empty() {
        return Err(PipelineError::Planning("plan contains no segments".to_string()));
    }

    let segments = items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_segment(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SegmentPlan::new(segments))
}

fn parse_segment(index: usize, item: &Value) -> Result<Segment, PipelineError> {
    let text = item
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PipelineError::Planning(format!("segment {} has no text", index + 1)))?;

    let duration = item
        .get("duration")
        .and_then(Value::as_f64)
        .ok_or_else(|| PipelineError::Planning(format!("segment {} has no duration", index + 1)))?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(PipelineError::Planning(format!(
            "segment {} has non-positive duration {}",
            index + 1,
            duration
        )));
    }

    let energy = item
        .get("energyTag")
        .or_else(|| item.get("energy"))
        .and_then(Value::as_str)
        .map(EnergyTag::parse_lenient)
        .unwrap_or_default();

    let visual_style = item
        .get("visualStyleTag")
        .or_else(|| item.get("visualStyle"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_VISUAL_STYLE.to_string());

    Ok(Segment {
        text: text.to_string(),
        duration,
        energy,
        visual_style,
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Offline planner used when no chat API is available
///
/// Hook, value and call to action, with durations split evenly.
#[derive(Debug, Default, Clone)]
pub struct TemplatePlanGenerator;

#[async_trait]
impl PlanGenerator for TemplatePlanGenerator {
    async fn generate(&self, brief: &Brief) -> Result<SegmentPlan, PipelineError> {
        let brand = brief.brand_name.trim();
        let description = brief.description.trim().trim_end_matches('.');
        let audience = brief.audience.trim();

        let mut lines: Vec<(String, EnergyTag, &str)> = vec![(
            format!("Meet {}.", brand),
            EnergyTag::High,
            "bold",
        )];
        lines.push((format!("{}.", description), EnergyTag::Medium, "warm"));
        if !audience.is_empty() {
            lines.push((
                format!("Made for {}.", audience),
                EnergyTag::Low,
                "calm",
            ));
        }
        let cta = brief.call_to_action.trim();
        let cta = if cta.is_empty() {
            format!("Discover {} today.", brand)
        } else {
            cta.to_string()
        };
        lines.push((cta, EnergyTag::High, "bold"));

        let share = brief.target_duration / lines.len() as f64;
        let segments = lines
            .into_iter()
            .map(|(text, energy, style)| Segment {
                text,
                duration: share,
                energy,
                visual_style: style.to_string(),
            })
            .collect();

        Ok(SegmentPlan::new(segments))
    }

    fn name(&self) -> &'static str {
        "template"
    }
}
