//! Server-Sent Events (SSE) for job progress streaming

use crate::{error::ApiResult, AppState};
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// GET /api/jobs/:id/events - SSE event stream for one job
///
/// The first event (`JobSnapshot`) carries the current job view, so clients
/// that connect late still see where the job stands. After that:
/// - JobProgress
/// - JobCompleted
/// - JobFailed
///
/// The stream ends after the terminal event. A subscriber that falls behind
/// the broadcast buffer gets a fresh `JobSnapshot` instead of the dropped events.
pub async fn job_event_stream(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before reading the snapshot so no update falls in between
    let mut rx = state.event_bus.subscribe();
    let snapshot = state.registry.get(job_id).await?;
    let registry = state.registry.clone();
    info!(job_id = %job_id, "New SSE client connected to job events");

    let stream = async_stream::stream! {
        match serde_json::to_string(&snapshot) {
            Ok(json) => yield Ok(Event::default().event("JobSnapshot").data(json)),
            Err(e) => warn!(job_id = %job_id, "SSE: Failed to serialize snapshot: {}", e),
        }
        if snapshot.status.is_terminal() {
            return;
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    let event = match received {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            // Dropped events may include the terminal one, so resync from the registry
                            warn!(job_id = %job_id, skipped, "SSE: Subscriber lagged, resending snapshot");
                            let view = match registry.get(job_id).await {
                                Ok(view) => view,
                                Err(e) => {
                                    warn!(job_id = %job_id, "SSE: Job vanished after lag: {}", e);
                                    break;
                                }
                            };
                            match serde_json::to_string(&view) {
                                Ok(json) => yield Ok(Event::default().event("JobSnapshot").data(json)),
                                Err(e) => warn!(job_id = %job_id, "SSE: Failed to serialize snapshot: {}", e),
                            }
                            if view.status.is_terminal() {
                                info!(job_id = %job_id, "SSE: Job finished while lagged, closing stream");
                                break;
                            }
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };
                    if event.job_id() != job_id {
                        continue;
                    }

                    let event_type = event.event_type();
                    match serde_json::to_string(&event) {
                        Ok(event_json) => {
                            debug!("SSE: Broadcasting job event: {}", event_type);
                            yield Ok(Event::default().event(event_type).data(event_json));
                        }
                        Err(e) => {
                            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                        }
                    }

                    if event.is_terminal() {
                        info!(job_id = %job_id, "SSE: Job finished, closing stream");
                        break;
                    }
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}
