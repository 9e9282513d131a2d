//! Payloads pushed to `/events` subscribers.

use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{
    session::{ChatMessage, SessionId, TeamSession, TeamSessionParticipant},
    timer::{TimerMode, TimerState},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the event channel.
pub struct ServerEvent {
    /// SSE event name.
    pub event: Option<String>,
    /// Serialised JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Event with an already serialised payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast whenever the local timer changes.
pub struct TimerChangedEvent {
    /// Clock state after the change.
    pub timer: TimerState,
    /// Team session currently driving the timer, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast once when a countdown reaches zero.
pub struct TimerCompletedEvent {
    /// Mode that just finished.
    pub mode: TimerMode,
    /// Whether the clock was following a team session.
    pub is_team_session: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast with the full session after any change.
pub struct SessionUpdatedEvent(pub TeamSession);

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when the tracked session stops existing for this device.
pub struct SessionClosedEvent {
    /// Session that went away.
    pub session_id: SessionId,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast after joins, departures and readiness or activity changes.
pub struct ParticipantsUpdatedEvent {
    /// Session whose members changed.
    pub session_id: SessionId,
    /// Members in join order.
    pub participants: Vec<TeamSessionParticipant>,
    /// Whether the readiness gate is open.
    pub all_ready: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast for every new chat entry, system announcements included.
pub struct ChatMessageEvent {
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// The new entry.
    pub message: ChatMessage,
}
