//! HTTP request handlers
//!
//! Implementation of the status and control endpoints.

use crate::{
    Error,
    server::app::AppState,
    session::CoordinatorStatus,
    types::{ActionResponse, DashboardSnapshot, ErrorResponse, PauseRequest, PingResponse},
    utils::version,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// HTTP status for an error coming out of the coordinator
fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::CycleInProgress => StatusCode::CONFLICT,
        Error::ReauthRequired { .. }
        | Error::SessionExpired { .. }
        | Error::Authentication { .. }
        | Error::Network { .. }
        | Error::Parse { .. }
        | Error::Acquisition(..) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &Error) -> HandlerError {
    (error_status(error), Json(ErrorResponse::from_error(error)))
}

/// Ping endpoint for health checks
///
/// GET /ping
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    let response = PingResponse::new(uptime, version::get_version());

    tracing::debug!(
        "Ping response: uptime={}s, version={}",
        uptime,
        version::get_version()
    );
    Json(response)
}

/// Coordinator status
///
/// GET /status
pub async fn status(State(state): State<AppState>) -> Json<CoordinatorStatus> {
    Json(state.coordinator.status().await)
}

/// Run one poll cycle immediately
///
/// POST /refresh
///
/// Answers 409 when a cycle is already running.
pub async fn refresh(
    State(state): State<AppState>,
) -> Result<Json<DashboardSnapshot>, HandlerError> {
    tracing::info!("Manual refresh requested");
    match state.coordinator.run_cycle().await {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(e) => {
            if matches!(e, Error::CycleInProgress) {
                tracing::debug!("Refresh rejected, cycle in progress");
            } else {
                tracing::warn!("Manual refresh failed: {}", e);
            }
            Err(error_response(&e))
        }
    }
}

/// Pause screen-time limits for a child
///
/// POST /children/{id}/pause with `{"minutes": n}`
pub async fn pause(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
    body: Bytes,
) -> Result<Json<ActionResponse>, HandlerError> {
    let request: PauseRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Rejected pause body: {}", e);
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::with_context(
                format!("Invalid JSON: {}", e),
                "json_deserialization",
            )),
        )
    })?;

    if request.minutes == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::with_context(
                "minutes must be greater than 0; use /resume to lift a pause",
                "request_validation",
            )),
        ));
    }

    let duration_secs = request.duration_secs();
    state
        .coordinator
        .pause_limits(&child_id, duration_secs)
        .await
        .map_err(|e| {
            tracing::warn!("Pause for {} failed: {}", child_id, e);
            error_response(&e)
        })?;

    Ok(Json(ActionResponse::new(child_id, duration_secs)))
}

/// Lift a pause for a child
///
/// POST /children/{id}/resume
pub async fn resume(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
) -> Result<Json<ActionResponse>, HandlerError> {
    state
        .coordinator
        .resume_limits(&child_id)
        .await
        .map_err(|e| {
            tracing::warn!("Resume for {} failed: {}", child_id, e);
            error_response(&e)
        })?;

    Ok(Json(ActionResponse::new(child_id, 0)))
}
