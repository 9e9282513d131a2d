//! OpenAPI document of the HTTP API.

use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the focus-crew API.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::events::event_stream,
        crate::routes::timer::get_timer,
        crate::routes::timer::start_timer,
        crate::routes::timer::pause_timer,
        crate::routes::timer::reset_timer,
        crate::routes::timer::set_timer_mode,
        crate::routes::sessions::list_sessions,
        crate::routes::sessions::create_session,
        crate::routes::sessions::get_session,
        crate::routes::sessions::delete_session,
        crate::routes::sessions::join_session,
        crate::routes::sessions::leave_session,
        crate::routes::sessions::set_ready,
        crate::routes::sessions::set_active,
        crate::routes::sessions::start_session,
        crate::routes::sessions::pause_session,
        crate::routes::sessions::set_session_mode,
        crate::routes::sessions::send_message,
        crate::routes::sessions::toggle_voice_chat,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::timer::TimerModeRequest,
            crate::dto::session::ProfileInput,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::ParticipantRequest,
            crate::dto::session::ReadyRequest,
            crate::dto::session::ActiveRequest,
            crate::dto::session::SessionModeRequest,
            crate::dto::session::SendMessageRequest,
            crate::dto::session::StartSessionResponse,
            crate::dto::events::TimerChangedEvent,
            crate::dto::events::TimerCompletedEvent,
            crate::dto::events::SessionUpdatedEvent,
            crate::dto::events::SessionClosedEvent,
            crate::dto::events::ParticipantsUpdatedEvent,
            crate::dto::events::ChatMessageEvent,
            crate::state::timer::TimerState,
            crate::state::timer::TimerMode,
            crate::state::session::TeamSession,
            crate::state::session::TeamSessionParticipant,
            crate::state::session::ChatMessage,
            crate::state::session::SessionUpdate,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "events", description = "Server-sent state-change stream"),
        (name = "timer", description = "Local solo timer"),
        (name = "sessions", description = "Team session coordination"),
    )
)]
pub struct ApiDoc;
