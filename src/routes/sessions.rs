//! Team session routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::session::{
        ActiveRequest, CreateSessionRequest, ParticipantRequest, ProfileInput, ReadyRequest,
        RequesterQuery, SendMessageRequest, SessionModeRequest, StartSessionResponse,
    },
    error::AppError,
    services::coordinator,
    state::{
        SharedState,
        session::{ChatMessage, SessionId, TeamSession},
    },
};

/// Team session lifecycle, membership, control and chat.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/join", post(join_session))
        .route("/sessions/{id}/leave", post(leave_session))
        .route("/sessions/{id}/ready", post(set_ready))
        .route("/sessions/{id}/active", post(set_active))
        .route("/sessions/{id}/start", post(start_session))
        .route("/sessions/{id}/pause", post(pause_session))
        .route("/sessions/{id}/mode", put(set_session_mode))
        .route("/sessions/{id}/messages", post(send_message))
        .route("/sessions/{id}/voice", post(toggle_voice_chat))
}

/// List every team session known to this device.
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "sessions",
    responses((status = 200, description = "Known team sessions", body = [TeamSession]))
)]
pub async fn list_sessions(State(state): State<SharedState>) -> Json<Vec<TeamSession>> {
    Json(coordinator::list_sessions(&state).await)
}

/// Create a session and follow it on this device.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created; the caller is host", body = TeamSession),
        (status = 400, description = "Invalid name or host")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<TeamSession>), AppError> {
    let session = coordinator::create_session(
        &state,
        &payload.name,
        payload.host.into(),
        payload.voice_chat_enabled,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Retrieve the local copy of a session by its code.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session code")),
    responses(
        (status = 200, description = "Session", body = TeamSession),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<SessionId>,
) -> Result<Json<TeamSession>, AppError> {
    Ok(Json(coordinator::get_session(&state, &id).await?))
}

/// Host-only deletion.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session code"), RequesterQuery),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 403, description = "Requester is not the host"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn delete_session(
    State(state): State<SharedState>,
    Path(id): Path<SessionId>,
    Valid(Query(query)): Valid<Query<RequesterQuery>>,
) -> Result<StatusCode, AppError> {
    coordinator::delete_session(&state, &id, &query.requester_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Join a session by code and follow it on this device.
#[utoipa::path(
    post,
    path = "/sessions/{id}/join",
    tag = "sessions",
    params(("id" = String, Path, description = "Session code")),
    request_body = ProfileInput,
    responses(
        (status = 200, description = "Joined (idempotent)", body = TeamSession),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Path(id): Path<SessionId>,
    Valid(Json(payload)): Valid<Json<ProfileInput>>,
) -> Result<Json<TeamSession>, AppError> {
    Ok(Json(
        coordinator::join_session(&state, &id, payload.into()).await?,
    ))
}

/// Leave a session; the host role is never handed over.
#[utoipa::path(
    post,
    path = "/sessions/{id}/leave",
    tag = "sessions",
    params(("id" = String, Path, description = "Session code")),
    request_body = ParticipantRequest,
    responses(
        (status = 204, description = "Left the session"),
        (status = 404, description = "Unknown session or not a participant")
    )
)]
pub async fn leave_session(
    State(state): State<SharedState>,
    Path(id): Path<SessionId>,
    Valid(Json(payload)): Valid<Json<ParticipantRequest>>,
) -> Result<StatusCode, AppError> {
    coordinator::leave_session(&state, &id, &payload.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Toggle a participant's readiness.
#[utoipa::path(
    post,
    path = "/sessions/{id}/ready",
    tag = "sessions",
    params(("id" = String, Path, description = "Session code")),
    request_body = ReadyRequest,
    responses(
        (status = 200, description = "Readiness updated", body = TeamSession),
        (status = 404, description = "Unknown session or not a participant")
    )
)]
pub async fn set_ready(
    State(state): State<SharedState>,
    Path(id): Path<SessionId>,
    Valid(Json(payload)): Valid<Json<ReadyRequest>>,
) -> Result<Json<TeamSession>, AppError> {
    Ok(Json(
        coordinator::set_ready(&state, &id, &payload.user_id, payload.ready).await?,
    ))
}

/// Toggle a participant's liveness flag.
#[utoipa::path(
    post,
    path = "/sessions/{id}/active",
    tag = "sessions",
    params(("id" = String, Path, description = "Session code")),
    request_body = ActiveRequest,
    responses(
        (status = 200, description = "Activity updated", body = TeamSession),
        (status = 404, description = "Unknown session or not a participant")
    )
)]
pub async fn set_active(
    State(state): State<SharedState>,
    Path(id): Path<SessionId>,
    Valid(Json(payload)): Valid<Json<ActiveRequest>>,
) -> Result<Json<TeamSession>, AppError> {
    Ok(Json(
        coordinator::set_active(&state, &id, &payload.user_id, payload.active).await?,
    ))
}

/// Start the group timer, subject to the readiness gate for non-hosts.
#[utoipa::path(
    post,
    path = "/sessions/{id}/start",
    tag = "sessions",
    params(("id" = String, Path, description = "Session code")),
    request_body = ParticipantRequest,
    responses(
        (status = 200, description = "Start outcome; `started` is false while the readiness gate is closed", body = StartSessionResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Path(id): Path<SessionId>,
    Valid(Json(payload)): Valid<Json<ParticipantRequest>>,
) -> Result<Json<StartSessionResponse>, AppError> {
    let started = coordinator::start(&state, &id, &payload.user_id).await?;
    let session = coordinator::get_session(&state, &id).await?;
    Ok(Json(StartSessionResponse { started, session }))
}

/// Pause the group timer. Any participant may pause.
#[utoipa::path(
    post,
    path = "/sessions/{id}/pause",
    tag = "sessions",
    params(("id" = String, Path, description = "Session code")),
    request_body = ParticipantRequest,
    responses(
        (status = 200, description = "Session paused", body = TeamSession),
        (status = 404, description = "Unknown session or not a participant")
    )
)]
pub async fn pause_session(
    State(state): State<SharedState>,
    Path(id): Path<SessionId>,
    Valid(Json(payload)): Valid<Json<ParticipantRequest>>,
) -> Result<Json<TeamSession>, AppError> {
    Ok(Json(
        coordinator::pause(&state, &id, &payload.user_id).await?,
    ))
}

/// Host-only mode change.
#[utoipa::path(
    put,
    path = "/sessions/{id}/mode",
    tag = "sessions",
    params(("id" = String, Path, description = "Session code")),
    request_body = SessionModeRequest,
    responses(
        (status = 200, description = "Mode switched, readiness cleared", body = TeamSession),
        (status = 403, description = "Requester is not the host"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn set_session_mode(
    State(state): State<SharedState>,
    Path(id): Path<SessionId>,
    Valid(Json(payload)): Valid<Json<SessionModeRequest>>,
) -> Result<Json<TeamSession>, AppError> {
    Ok(Json(
        coordinator::set_mode(&state, &id, &payload.requester_id, payload.mode).await?,
    ))
}

/// Post a chat message to the session.
#[utoipa::path(
    post,
    path = "/sessions/{id}/messages",
    tag = "sessions",
    params(("id" = String, Path, description = "Session code")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message posted", body = ChatMessage),
        (status = 400, description = "Empty, oversized or reserved-sender message"),
        (status = 404, description = "Unknown session or not a participant")
    )
)]
pub async fn send_message(
    State(state): State<SharedState>,
    Path(id): Path<SessionId>,
    Valid(Json(payload)): Valid<Json<SendMessageRequest>>,
) -> Result<(StatusCode, Json<ChatMessage>), AppError> {
    let message =
        coordinator::send_message(&state, &id, payload.sender.into(), &payload.text).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Flip the voice chat flag. Any participant may toggle it.
#[utoipa::path(
    post,
    path = "/sessions/{id}/voice",
    tag = "sessions",
    params(("id" = String, Path, description = "Session code")),
    request_body = ParticipantRequest,
    responses(
        (status = 200, description = "Voice chat flag flipped", body = TeamSession),
        (status = 404, description = "Unknown session or not a participant")
    )
)]
pub async fn toggle_voice_chat(
    State(state): State<SharedState>,
    Path(id): Path<SessionId>,
    Valid(Json(payload)): Valid<Json<ParticipantRequest>>,
) -> Result<Json<TeamSession>, AppError> {
    Ok(Json(
        coordinator::toggle_voice_chat(&state, &id, &payload.user_id).await?,
    ))
}
