//! Named state-change notifications sent through the event hub.

use serde::Serialize;
use tracing::warn;

use crate::{
    dto::events::{
        ChatMessageEvent, ParticipantsUpdatedEvent, ServerEvent, SessionClosedEvent,
        SessionUpdatedEvent, TimerChangedEvent, TimerCompletedEvent,
    },
    state::{
        SharedState,
        session::{ChatMessage, SessionId, SessionUpdate, TeamSession},
        timer::{TimerMode, TimerState},
    },
};

/// The local clock changed.
pub const EVENT_TIMER_CHANGED: &str = "timer.changed";
/// A countdown reached zero.
pub const EVENT_TIMER_COMPLETED: &str = "timer.completed";
/// A session copy changed.
pub const EVENT_SESSION_UPDATED: &str = "session.updated";
/// A session went away.
pub const EVENT_SESSION_CLOSED: &str = "session.closed";
/// Members or their flags changed.
pub const EVENT_PARTICIPANTS_UPDATED: &str = "participants.updated";
/// A chat entry was appended.
pub const EVENT_CHAT_MESSAGE: &str = "chat.message";

/// Broadcast the local timer after any change.
pub fn broadcast_timer_changed(
    state: &SharedState,
    timer: &TimerState,
    session_id: Option<&SessionId>,
) {
    let payload = TimerChangedEvent {
        timer: timer.clone(),
        session_id: session_id.cloned(),
    };
    send_event(state, EVENT_TIMER_CHANGED, &payload);
}

/// Broadcast the completion edge of a countdown.
pub fn broadcast_timer_completed(state: &SharedState, mode: TimerMode, is_team_session: bool) {
    let payload = TimerCompletedEvent {
        mode,
        is_team_session,
    };
    send_event(state, EVENT_TIMER_COMPLETED, &payload);
}

/// Broadcast the full session record.
pub fn broadcast_session_updated(state: &SharedState, session: &TeamSession) {
    send_event(
        state,
        EVENT_SESSION_UPDATED,
        &SessionUpdatedEvent(session.clone()),
    );
}

/// Broadcast that a session stopped existing for this device.
pub fn broadcast_session_closed(state: &SharedState, session_id: &SessionId) {
    let payload = SessionClosedEvent {
        session_id: session_id.clone(),
    };
    send_event(state, EVENT_SESSION_CLOSED, &payload);
}

/// Broadcast the participant list together with the readiness gate.
pub fn broadcast_participants(state: &SharedState, session: &TeamSession) {
    let payload = ParticipantsUpdatedEvent {
        session_id: session.id.clone(),
        participants: session.participants.clone(),
        all_ready: session.all_ready(),
    };
    send_event(state, EVENT_PARTICIPANTS_UPDATED, &payload);
}

/// Broadcast a new chat entry.
pub fn broadcast_chat_message(state: &SharedState, session_id: &SessionId, message: &ChatMessage) {
    let payload = ChatMessageEvent {
        session_id: session_id.clone(),
        message: message.clone(),
    };
    send_event(state, EVENT_CHAT_MESSAGE, &payload);
}

/// Broadcast the notifications matching an applied update.
pub fn broadcast_session_change(state: &SharedState, session: &TeamSession, update: &SessionUpdate) {
    match update {
        SessionUpdate::Ready { .. } | SessionUpdate::Activity { .. } => {
            broadcast_participants(state, session)
        }
        SessionUpdate::Message { message } => broadcast_chat_message(state, &session.id, message),
        SessionUpdate::Mode { .. } => {
            broadcast_participants(state, session);
        }
        SessionUpdate::Running { .. } | SessionUpdate::VoiceChat { .. } => {}
    }
    broadcast_session_updated(state, session);
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.events().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize event payload"),
    }
}
