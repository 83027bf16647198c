//! Brand brief (immutable job input)

use serde::{Deserialize, Serialize};

/// Shortest video the service will produce (seconds)
pub const MIN_TARGET_DURATION: f64 = 5.0;
/// Longest video the service will produce (seconds)
pub const MAX_TARGET_DURATION: f64 = 120.0;

/// Brand brief submitted by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brief {
    pub brand_name: String,
    pub description: String,
    #[serde(default)]
    pub audience: String,
    /// Free-form tone ("energetic", "calm", ...); drives voice selection
    #[serde(default)]
    pub tone: String,
    /// Target video length in seconds
    pub target_duration: f64,
    #[serde(default)]
    pub call_to_action: String,
}

impl Brief {
    /// Reject briefs the pipeline cannot produce a video for
    pub fn validate(&self) -> Result<(), String> {
        if self.brand_name.trim().is_empty() {
            return Err("brandName must not be empty".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("description must not be empty".to_string());
        }
        if !self.target_duration.is_finite()
            || self.target_duration < MIN_TARGET_DURATION
            || self.target_duration > MAX_TARGET_DURATION
        {
            return Err(format!(
                "targetDuration must be between {} and {} seconds (got {})",
                MIN_TARGET_DURATION, MAX_TARGET_DURATION, self.target_duration
            ));
        }
        Ok(())
    }
}
