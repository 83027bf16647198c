//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("reel-gen")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Short git hash captured by build.rs
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Jobs currently holding an admission slot
    pub active_jobs: usize,
    pub max_active_jobs: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: crate::config::MODULE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        uptime_seconds,
        active_jobs: state.admission.active_jobs(),
        max_active_jobs: state.admission.max_jobs(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
