//! Team session operations.
//!
//! Every mutation is validated against the local shadow copy, applied to it
//! optimistically, and then pushed to the backend. A failed push is logged
//! and left for the next reconciliation to heal. Operations on one session
//! run under that session's gate.

use std::future::Future;

use tracing::{debug, info, warn};

use crate::{
    dao::backend::BackendResult,
    error::ServiceError,
    services::{events, sync_agent, timer_service},
    state::{
        SharedState,
        session::{
            ChatMessage, Profile, SYSTEM_SENDER_ID, SessionId, SessionUpdate, TeamSession,
            TeamSessionParticipant,
        },
        timer::TimerMode,
    },
};

/// Longer session names are cut.
pub const MAX_SESSION_NAME_CHARS: usize = 60;
/// Longer chat messages are rejected.
pub const MAX_MESSAGE_CHARS: usize = 500;
const MAX_CODE_ATTEMPTS: usize = 16;

/// Every session known locally, in the order the backend reported them.
pub async fn list_sessions(state: &SharedState) -> Vec<TeamSession> {
    state.store().read().await.list()
}

/// Local copy of `id`.
pub async fn get_session(state: &SharedState, id: &SessionId) -> Result<TeamSession, ServiceError> {
    Ok(state.store().read().await.get(id)?.clone())
}

/// Pull the authoritative list now instead of waiting for the next cycle.
pub async fn refresh(state: &SharedState) -> Result<(), ServiceError> {
    sync_agent::poll_once(state).await.map(|_| ())
}

/// Create a session with `host` as its only participant and follow it.
pub async fn create_session(
    state: &SharedState,
    name: &str,
    host: Profile,
    voice_chat_enabled: bool,
) -> Result<TeamSession, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "session name must not be empty".into(),
        ));
    }
    let host = validated_profile(host)?;
    let name: String = name.chars().take(MAX_SESSION_NAME_CHARS).collect();

    let id = fresh_code(state).await;
    let _gate = state.lock_session(&id).await;
    let session = TeamSession::new(
        id.clone(),
        name,
        host.clone(),
        &state.config().durations(),
        voice_chat_enabled,
    );
    state.store().write().await.upsert(session.clone());
    events::broadcast_session_updated(state, &session);
    info!(session_id = %id, host_id = %host.id, name = %session.name, "team session created");

    push(
        state,
        &id,
        "create",
        state.backend().create_session(session.clone()),
    )
    .await;
    sync_agent::track(state, &id, &host.id).await;

    Ok(session)
}

/// Join `id` as `profile`. Joining twice leaves a single participant entry.
pub async fn join_session(
    state: &SharedState,
    id: &SessionId,
    profile: Profile,
) -> Result<TeamSession, ServiceError> {
    let profile = validated_profile(profile)?;
    if !state.store().read().await.contains(id) {
        // The code may have been shared before this device ever polled it.
        if let Err(err) = refresh(state).await {
            warn!(session_id = %id, error = %err, "refresh before join failed");
        }
    }

    let _gate = state.lock_session(id).await;
    let participant = TeamSessionParticipant::joining(profile.clone());
    let added = state
        .store()
        .write()
        .await
        .add_participant(id, participant.clone())?;

    if added {
        let announcement = SessionUpdate::Message {
            message: ChatMessage::system(format!("{} joined the session.", profile.name)),
        };
        let session = apply_local(state, id, &announcement).await?;
        events::broadcast_participants(state, &session);
        info!(session_id = %id, user_id = %profile.id, "participant joined");

        push(
            state,
            id,
            "join",
            state.backend().join_session(id.clone(), participant),
        )
        .await;
        push_update(state, id, announcement).await;
    } else {
        debug!(session_id = %id, user_id = %profile.id, "participant already joined");
    }

    sync_agent::track(state, id, &profile.id).await;
    get_session(state, id).await
}

/// Remove `user_id` from `id`. The host role is never handed over.
pub async fn leave_session(
    state: &SharedState,
    id: &SessionId,
    user_id: &str,
) -> Result<(), ServiceError> {
    let _gate = state.lock_session(id).await;
    let removed = state
        .store()
        .write()
        .await
        .remove_participant(id, user_id)?
        .ok_or_else(|| not_a_participant(id, user_id))?;

    let announcement = SessionUpdate::Message {
        message: ChatMessage::system(format!("{} left the session.", removed.name)),
    };
    let session = apply_local(state, id, &announcement).await?;
    events::broadcast_participants(state, &session);
    info!(
        session_id = %id,
        user_id,
        was_host = session.host_id == user_id,
        "participant left"
    );

    if is_tracked_as(state, id, user_id).await {
        sync_agent::untrack(state).await;
    }

    push(
        state,
        id,
        "leave",
        state.backend().leave_session(id.clone(), user_id.to_string()),
    )
    .await;
    push_update(state, id, announcement).await;
    Ok(())
}

/// Delete `id`. Only the host may do this.
pub async fn delete_session(
    state: &SharedState,
    id: &SessionId,
    requester_id: &str,
) -> Result<(), ServiceError> {
    {
        let _gate = state.lock_session(id).await;
        let mut store = state.store().write().await;
        if !store.get(id)?.is_host(requester_id) {
            return Err(ServiceError::Forbidden(
                "only the host can delete the session".into(),
            ));
        }
        store.remove(id);
        drop(store);

        if sync_agent::tracked_session(state).await.as_ref() == Some(id) {
            sync_agent::untrack(state).await;
        }
        events::broadcast_session_closed(state, id);
        info!(session_id = %id, "team session deleted");

        push(
            state,
            id,
            "delete",
            state.backend().delete_session(id.clone()),
        )
        .await;
    }
    state.forget_session(id);
    Ok(())
}

/// Readiness flag of a participant.
pub async fn set_ready(
    state: &SharedState,
    id: &SessionId,
    user_id: &str,
    ready: bool,
) -> Result<TeamSession, ServiceError> {
    let _gate = state.lock_session(id).await;
    commit(
        state,
        id,
        SessionUpdate::Ready {
            user_id: user_id.to_string(),
            ready,
        },
    )
    .await
}

/// Liveness flag of a participant.
pub async fn set_active(
    state: &SharedState,
    id: &SessionId,
    user_id: &str,
    active: bool,
) -> Result<TeamSession, ServiceError> {
    let _gate = state.lock_session(id).await;
    commit(
        state,
        id,
        SessionUpdate::Activity {
            user_id: user_id.to_string(),
            active,
        },
    )
    .await
}

/// Start the group timer.
///
/// The host may always start. Anyone else only gets through the readiness
/// gate once every participant is ready; otherwise nothing changes and
/// `Ok(false)` is returned.
pub async fn start(
    state: &SharedState,
    id: &SessionId,
    requester_id: &str,
) -> Result<bool, ServiceError> {
    let _gate = state.lock_session(id).await;
    let session = state.store().read().await.get(id)?.clone();

    if !session.is_host(requester_id) && !session.all_ready() {
        info!(session_id = %id, requester_id, "start refused: not every participant is ready");
        return Ok(false);
    }
    if session.is_running {
        return Ok(true);
    }
    if session.time_remaining == 0 {
        return Ok(false);
    }

    let session = commit(state, id, SessionUpdate::Running { is_running: true }).await?;
    follow_if_tracked(state, &session).await;
    Ok(true)
}

/// Pause the group timer. The host or any participant may pause.
pub async fn pause(
    state: &SharedState,
    id: &SessionId,
    requester_id: &str,
) -> Result<TeamSession, ServiceError> {
    let _gate = state.lock_session(id).await;
    let session = state.store().read().await.get(id)?.clone();
    if !session.is_participant(requester_id) {
        return Err(not_a_participant(id, requester_id));
    }
    if !session.is_running {
        return Ok(session);
    }

    let session = commit(state, id, SessionUpdate::Running { is_running: false }).await?;
    follow_if_tracked(state, &session).await;
    Ok(session)
}

/// Host-only manual mode selection. Resets the countdown for `mode` and
/// clears every readiness flag.
pub async fn set_mode(
    state: &SharedState,
    id: &SessionId,
    requester_id: &str,
    mode: TimerMode,
) -> Result<TeamSession, ServiceError> {
    let _gate = state.lock_session(id).await;
    if !state.store().read().await.get(id)?.is_host(requester_id) {
        return Err(ServiceError::Forbidden(
            "only the host can change the mode".into(),
        ));
    }

    let change = SessionUpdate::Mode {
        mode,
        time_remaining: state.config().durations().for_mode(mode),
    };
    commit(state, id, change).await?;
    let announcement = SessionUpdate::Message {
        message: ChatMessage::system(format!("Host switched to {}.", mode.label())),
    };
    let session = commit(state, id, announcement).await?;
    follow_if_tracked(state, &session).await;
    Ok(session)
}

/// Append a chat message authored by `sender`.
pub async fn send_message(
    state: &SharedState,
    id: &SessionId,
    sender: Profile,
    text: &str,
) -> Result<ChatMessage, ServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::InvalidInput("message must not be empty".into()));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ServiceError::InvalidInput(format!(
            "message exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }
    if sender.id == SYSTEM_SENDER_ID {
        return Err(ServiceError::InvalidInput(format!(
            "sender id `{SYSTEM_SENDER_ID}` is reserved"
        )));
    }

    let _gate = state.lock_session(id).await;
    if !state.store().read().await.get(id)?.is_participant(&sender.id) {
        return Err(not_a_participant(id, &sender.id));
    }

    let message = ChatMessage::new(&sender, text);
    commit(
        state,
        id,
        SessionUpdate::Message {
            message: message.clone(),
        },
    )
    .await?;
    Ok(message)
}

/// Flip the voice chat flag. Any participant may do this.
pub async fn toggle_voice_chat(
    state: &SharedState,
    id: &SessionId,
    requester_id: &str,
) -> Result<TeamSession, ServiceError> {
    let _gate = state.lock_session(id).await;
    let enabled = {
        let store = state.store().read().await;
        let session = store.get(id)?;
        if !session.is_participant(requester_id) {
            return Err(not_a_participant(id, requester_id));
        }
        !session.voice_chat_enabled
    };
    commit(state, id, SessionUpdate::VoiceChat { enabled }).await
}

/// Apply `update` locally, notify subscribers and push it to the backend.
/// The caller holds the session gate.
async fn commit(
    state: &SharedState,
    id: &SessionId,
    update: SessionUpdate,
) -> Result<TeamSession, ServiceError> {
    let session = apply_local(state, id, &update).await?;
    events::broadcast_session_change(state, &session, &update);
    push_update(state, id, update).await;
    Ok(session)
}

async fn apply_local(
    state: &SharedState,
    id: &SessionId,
    update: &SessionUpdate,
) -> Result<TeamSession, ServiceError> {
    let mut store = state.store().write().await;
    let session = store.get_mut(id)?;
    session.apply(update)?;
    Ok(session.clone())
}

async fn push_update(state: &SharedState, id: &SessionId, update: SessionUpdate) {
    let operation = update.kind();
    push(
        state,
        id,
        operation,
        state.backend().apply_update(id.clone(), update),
    )
    .await;
}

async fn push<F>(state: &SharedState, id: &SessionId, operation: &'static str, call: F)
where
    F: Future<Output = BackendResult<()>>,
{
    if let Err(err) = state.remote(call).await {
        warn!(
            session_id = %id,
            operation,
            error = %err,
            "remote session update failed; awaiting reconciliation"
        );
    }
}

/// Keep the local clock in step with the session this device follows.
async fn follow_if_tracked(state: &SharedState, session: &TeamSession) {
    if sync_agent::tracked_session(state).await.as_ref() == Some(&session.id) {
        timer_service::mirror_session(state, session).await;
    }
}

async fn is_tracked_as(state: &SharedState, id: &SessionId, user_id: &str) -> bool {
    let tracking = state.tracking().lock().await;
    tracking
        .as_ref()
        .is_some_and(|t| t.session_id == *id && t.user_id == user_id)
}

/// Draw codes until one is unknown locally; the backend rejects the rare
/// collision with a session this device has not seen.
async fn fresh_code(state: &SharedState) -> SessionId {
    let store = state.store().read().await;
    let mut id = SessionId::generate();
    for _ in 1..MAX_CODE_ATTEMPTS {
        if !store.contains(&id) {
            break;
        }
        id = SessionId::generate();
    }
    id
}

fn validated_profile(profile: Profile) -> Result<Profile, ServiceError> {
    let id = profile.id.trim();
    if id.is_empty() {
        return Err(ServiceError::InvalidInput("user id must not be empty".into()));
    }
    if id == SYSTEM_SENDER_ID {
        return Err(ServiceError::InvalidInput(format!(
            "user id `{SYSTEM_SENDER_ID}` is reserved"
        )));
    }
    let name = profile.name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "display name must not be empty".into(),
        ));
    }
    Ok(Profile::new(id, name, profile.avatar.trim()))
}

fn not_a_participant(id: &SessionId, user_id: &str) -> ServiceError {
    ServiceError::NotFound(format!(
        "user `{user_id}` is not a participant of session `{id}`"
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::memory::MemorySessionBackend,
        services::observer::LoggingObserver,
        state::{AppState, timer::ModeDurations},
    };

    fn app() -> (SharedState, Arc<MemorySessionBackend>) {
        let durations = ModeDurations::default();
        let backend = Arc::new(MemorySessionBackend::new(durations, 4));
        let state = AppState::new(
            AppConfig::default(),
            backend.clone(),
            Arc::new(LoggingObserver),
        );
        (state, backend)
    }

    fn host() -> Profile {
        Profile::new("host", "Hana", "fox")
    }

    #[tokio::test]
    async fn create_rejects_blank_names_and_trims() {
        let (state, _) = app();
        let err = create_session(&state, "   ", host(), false).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(list_sessions(&state).await.is_empty());

        let long = "x".repeat(80);
        let session = create_session(&state, &format!("  {long} "), host(), false)
            .await
            .unwrap();
        assert_eq!(session.name.chars().count(), MAX_SESSION_NAME_CHARS);
        assert_eq!(session.participants.len(), 1);
        assert!(session.is_host("host"));
    }

    #[tokio::test]
    async fn join_unknown_session_is_not_found() {
        let (state, _) = app();
        let err = join_session(&state, &SessionId::from_code("ZZZZZZ"), host())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn join_announces_once() {
        let (state, backend) = app();
        let session = create_session(&state, "Standup", host(), false).await.unwrap();
        let guest = Profile::new("u1", "Uma", "owl");

        join_session(&state, &session.id, guest.clone()).await.unwrap();
        let joined = join_session(&state, &session.id, guest).await.unwrap();

        assert_eq!(joined.participants.len(), 2);
        let announcements = joined.messages.iter().filter(|m| m.is_system()).count();
        assert_eq!(announcements, 1);
        assert_eq!(backend.session(&session.id).unwrap().participants.len(), 2);
    }

    #[tokio::test]
    async fn messages_are_validated_before_mutation() {
        let (state, _) = app();
        let session = create_session(&state, "Standup", host(), false).await.unwrap();

        let too_long = "y".repeat(MAX_MESSAGE_CHARS + 1);
        for text in ["", "   ", too_long.as_str()] {
            let err = send_message(&state, &session.id, host(), text)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }

        let impostor = Profile::new(SYSTEM_SENDER_ID, "System", "");
        let err = send_message(&state, &session.id, impostor, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let stranger = Profile::new("nobody", "Nora", "cat");
        let err = send_message(&state, &session.id, stranger, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        assert!(get_session(&state, &session.id).await.unwrap().messages.is_empty());

        let message = send_message(&state, &session.id, host(), "  let's go ")
            .await
            .unwrap();
        assert_eq!(message.text, "let's go");
        assert_eq!(
            get_session(&state, &session.id).await.unwrap().messages,
            vec![message]
        );
    }

    #[tokio::test]
    async fn set_mode_is_host_only_and_clears_readiness() {
        let (state, _) = app();
        let session = create_session(&state, "Standup", host(), false).await.unwrap();
        let guest = Profile::new("u1", "Uma", "owl");
        join_session(&state, &session.id, guest).await.unwrap();
        set_ready(&state, &session.id, "u1", true).await.unwrap();

        let err = set_mode(&state, &session.id, "u1", TimerMode::LongBreak)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let updated = set_mode(&state, &session.id, "host", TimerMode::LongBreak)
            .await
            .unwrap();
        assert_eq!(updated.current_mode, TimerMode::LongBreak);
        assert_eq!(updated.time_remaining, 15 * 60);
        assert!(updated.participants.iter().all(|p| !p.is_ready));
    }

    #[tokio::test]
    async fn voice_chat_toggle_is_open_to_participants() {
        let (state, _) = app();
        let session = create_session(&state, "Standup", host(), false).await.unwrap();
        join_session(&state, &session.id, Profile::new("u1", "Uma", "owl"))
            .await
            .unwrap();

        let toggled = toggle_voice_chat(&state, &session.id, "u1").await.unwrap();
        assert!(toggled.voice_chat_enabled);

        let err = toggle_voice_chat(&state, &session.id, "stranger")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn ready_for_non_participant_is_not_found() {
        let (state, _) = app();
        let session = create_session(&state, "Standup", host(), false).await.unwrap();
        let err = set_ready(&state, &session.id, "ghost", true)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
