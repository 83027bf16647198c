//! reel-gen library interface
//!
//! Exposes the router, state and pipeline for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, PipelineError};

use axum::Router;
use chrono::{DateTime, Utc};
use reel_common::events::EventBus;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::services::{AdmissionControl, GenerationOrchestrator, JobRegistry, Providers};

/// Event bus capacity (events buffered per slow SSE subscriber)
pub const EVENT_BUS_CAPACITY: usize = 100;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: JobRegistry,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub admission: AdmissionControl,
    /// Folder served under /videos
    pub output_dir: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: &ServiceConfig,
        providers: Providers,
        output_dir: PathBuf,
        work_dir: PathBuf,
    ) -> Self {
        let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
        let registry = JobRegistry::new(event_bus.clone());
        let admission = AdmissionControl::new(
            config.limits.max_active_jobs,
            config.encoder.max_concurrent,
        );
        let orchestrator = Arc::new(GenerationOrchestrator::new(
            config,
            providers,
            registry.clone(),
            &admission,
            output_dir.clone(),
            work_dir,
        ));

        Self {
            registry,
            event_bus,
            orchestrator,
            admission,
            output_dir,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let videos = ServeDir::new(&state.output_dir);

    Router::new()
        .merge(api::job_routes())
        .route("/api/jobs/:id/events", get(api::job_event_stream))
        .merge(api::health_routes())
        .nest_service("/videos", videos)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
