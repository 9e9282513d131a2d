//! Local timer routes.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};

use crate::{
    dto::timer::TimerModeRequest,
    error::AppError,
    services::timer_service,
    state::{SharedState, timer::TimerState},
};

/// Routes driving the local solo timer.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/timer", get(get_timer))
        .route("/timer/start", post(start_timer))
        .route("/timer/pause", post(pause_timer))
        .route("/timer/reset", post(reset_timer))
        .route("/timer/mode", put(set_timer_mode))
}

/// Snapshot of the local clock, solo or mirroring a team session.
#[utoipa::path(
    get,
    path = "/timer",
    tag = "timer",
    responses((status = 200, description = "Current timer", body = TimerState))
)]
pub async fn get_timer(State(state): State<SharedState>) -> Json<TimerState> {
    Json(timer_service::snapshot(&state).await)
}

/// Start the solo timer.
#[utoipa::path(
    post,
    path = "/timer/start",
    tag = "timer",
    responses(
        (status = 200, description = "Timer started (no-op at zero)", body = TimerState),
        (status = 403, description = "Timer is driven by a team session")
    )
)]
pub async fn start_timer(State(state): State<SharedState>) -> Result<Json<TimerState>, AppError> {
    Ok(Json(timer_service::start(&state).await?))
}

/// Pause the solo timer.
#[utoipa::path(
    post,
    path = "/timer/pause",
    tag = "timer",
    responses(
        (status = 200, description = "Timer paused", body = TimerState),
        (status = 403, description = "Timer is driven by a team session")
    )
)]
pub async fn pause_timer(State(state): State<SharedState>) -> Result<Json<TimerState>, AppError> {
    Ok(Json(timer_service::pause(&state).await?))
}

/// Refill the current mode and stop the solo timer.
#[utoipa::path(
    post,
    path = "/timer/reset",
    tag = "timer",
    responses(
        (status = 200, description = "Timer refilled and stopped", body = TimerState),
        (status = 403, description = "Timer is driven by a team session")
    )
)]
pub async fn reset_timer(State(state): State<SharedState>) -> Result<Json<TimerState>, AppError> {
    Ok(Json(timer_service::reset(&state).await?))
}

/// Manual mode selection; the focus counter does not move.
#[utoipa::path(
    put,
    path = "/timer/mode",
    tag = "timer",
    request_body = TimerModeRequest,
    responses(
        (status = 200, description = "Mode switched", body = TimerState),
        (status = 403, description = "Timer is driven by a team session")
    )
)]
pub async fn set_timer_mode(
    State(state): State<SharedState>,
    Json(payload): Json<TimerModeRequest>,
) -> Result<Json<TimerState>, AppError> {
    Ok(Json(timer_service::set_mode(&state, payload.mode).await?))
}
