//! Job submission and status API handlers
//!
//! POST /api/generate, GET /api/jobs/:id, GET /api/jobs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Brief, JobView},
    AppState,
};

/// POST /api/generate response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub job_id: Uuid,
}

/// POST /api/generate
///
/// Validate the brief, admit the job and start its pipeline in the
/// background. Returns 202 Accepted with the job ID.
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<Brief>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<GenerateResponse>)> {
    let Json(brief) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    brief.validate().map_err(ApiError::BadRequest)?;

    let permit = state.admission.try_admit().ok_or_else(|| {
        ApiError::ServiceUnavailable(format!(
            "Active job limit reached ({} jobs)",
            state.admission.max_jobs()
        ))
    })?;

    let job_id = state.registry.create().await;
    tracing::info!(
        job_id = %job_id,
        brand = %brief.brand_name,
        target_duration = brief.target_duration,
        "Generation job accepted"
    );

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        // Admission slot is held until the job reaches a terminal status
        let _permit = permit;
        tracing::info!(job_id = %job_id, "Background generation task started");
        orchestrator.run(job_id, brief).await;
    });

    Ok((StatusCode::ACCEPTED, Json(GenerateResponse { job_id })))
}

/// GET /api/jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobView>> {
    Ok(Json(state.registry.get(job_id).await?))
}

/// GET /api/jobs (newest first)
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobView>> {
    Json(state.registry.list().await)
}

/// Build job routes
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/jobs", get(list_jobs))
        .route("/api/jobs/:id", get(get_job))
}
