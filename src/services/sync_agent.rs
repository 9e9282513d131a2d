//! Background reconciliation of the tracked team session.
//!
//! The backend owns every team session. While this device follows one, a
//! loop fetches the authoritative list at a fixed interval and overwrites the
//! local shadow copies and the clock with it: the last reconciliation wins
//! over any optimistic change made since the previous poll.

use tokio::{
    task::{self, JoinHandle},
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    services::{events, timer_service},
    state::{
        SharedState, SyncTracking,
        session::{SessionId, TeamSession},
    },
};

/// Outcome of applying one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The fetched list replaced the local cache.
    Applied,
    /// A newer poll was applied already, or tracking changed mid-flight.
    Stale,
    /// The tracked session no longer exists on the backend.
    Closed,
}

/// Follow `session_id` as `user_id`, starting the poll loop if idle.
///
/// Tracking the same session again is a no-op; tracking another one replaces
/// the previous tracking.
pub async fn track(state: &SharedState, session_id: &SessionId, user_id: &str) {
    let mut tracking = state.tracking().lock().await;
    if let Some(current) = tracking.as_ref() {
        let live = current.task.as_ref().is_some_and(|task| !task.is_finished());
        if live && current.session_id == *session_id && current.user_id == user_id {
            return;
        }
    }

    if let Some(previous) = tracking.take() {
        if let Some(task) = previous.task {
            task.abort();
        }
        info!(session_id = %previous.session_id, "stopped tracking team session");
    }

    *tracking = Some(SyncTracking {
        session_id: session_id.clone(),
        user_id: user_id.to_string(),
        tracked_since: state.last_poll_sequence(),
        task: Some(spawn_loop(state.clone())),
    });
    drop(tracking);
    info!(%session_id, user_id, "tracking team session");

    let session = state.store().read().await.get(session_id).cloned().ok();
    if let Some(session) = session {
        timer_service::mirror_session(state, &session).await;
    }
}

/// Stop following the tracked session: the poll loop is aborted and the local
/// clock stops with it.
pub async fn untrack(state: &SharedState) -> Option<SessionId> {
    let previous = state.tracking().lock().await.take()?;
    if let Some(task) = previous.task {
        task.abort();
    }
    halt_clock(state).await;
    info!(session_id = %previous.session_id, "stopped tracking team session");
    Some(previous.session_id)
}

/// Session currently followed by this device.
pub async fn tracked_session(state: &SharedState) -> Option<SessionId> {
    state
        .tracking()
        .lock()
        .await
        .as_ref()
        .map(|tracking| tracking.session_id.clone())
}

/// User this device follows the tracked session as.
pub async fn tracked_user(state: &SharedState) -> Option<String> {
    state
        .tracking()
        .lock()
        .await
        .as_ref()
        .map(|tracking| tracking.user_id.clone())
}

/// Fetch the authoritative list once and reconcile it.
pub async fn poll_once(state: &SharedState) -> Result<Reconciliation, ServiceError> {
    let sequence = state.next_poll_sequence();
    let sessions = state.remote(state.backend().list_sessions()).await?;
    Ok(reconcile(state, sequence, sessions).await)
}

/// Apply the result of poll `sequence`.
///
/// Results older than the last applied poll are discarded, so a slow response
/// never overwrites a newer one that returned first.
pub async fn reconcile(
    state: &SharedState,
    sequence: u64,
    sessions: Vec<TeamSession>,
) -> Reconciliation {
    let mut applied = state.applied_polls().await;
    if sequence <= *applied {
        debug!(sequence, last_applied = *applied, "discarding stale poll");
        return Reconciliation::Stale;
    }

    let Some((session_id, tracked_since)) = tracking_marker(state).await else {
        state.store().write().await.replace_all(sessions, None);
        *applied = sequence;
        return Reconciliation::Applied;
    };

    let _gate = state.lock_session(&session_id).await;
    if tracking_marker(state).await != Some((session_id.clone(), tracked_since)) {
        debug!(sequence, %session_id, "tracking changed during poll");
        return Reconciliation::Stale;
    }
    *applied = sequence;

    let fetched = sessions.iter().find(|s| s.id == session_id).cloned();
    match fetched {
        Some(session) => {
            let changed = {
                let mut store = state.store().write().await;
                let changed = store.get(&session_id).ok() != Some(&session);
                store.replace_all(sessions, None);
                changed
            };
            timer_service::mirror_session(state, &session).await;
            if changed {
                events::broadcast_session_updated(state, &session);
            }
            Reconciliation::Applied
        }
        None if sequence > tracked_since => {
            state.store().write().await.replace_all(sessions, None);
            close_tracking(state, &session_id).await;
            Reconciliation::Closed
        }
        None => {
            // Issued before the session was registered remotely.
            state
                .store()
                .write()
                .await
                .replace_all(sessions, Some(&session_id));
            Reconciliation::Applied
        }
    }
}

fn spawn_loop(state: SharedState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(state.config().sync_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match poll_once(&state).await {
                Ok(Reconciliation::Closed) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "team session poll failed; retrying next cycle")
                }
            }
        }
    })
}

async fn tracking_marker(state: &SharedState) -> Option<(SessionId, u64)> {
    state
        .tracking()
        .lock()
        .await
        .as_ref()
        .map(|tracking| (tracking.session_id.clone(), tracking.tracked_since))
}

/// The tracked session was deleted remotely. When this runs on the poll loop
/// itself the loop handle is released and the loop exits on its own.
async fn close_tracking(state: &SharedState, session_id: &SessionId) {
    let previous = state.tracking().lock().await.take();
    if let Some(handle) = previous.and_then(|tracking| tracking.task) {
        if task::try_id() != Some(handle.id()) {
            handle.abort();
        }
    }
    halt_clock(state).await;
    state.forget_session(session_id);
    events::broadcast_session_closed(state, session_id);
    info!(%session_id, "team session closed remotely");
}

async fn halt_clock(state: &SharedState) {
    let snapshot = {
        let mut clock = state.timer().write().await;
        clock.pause();
        clock.state().clone()
    };
    timer_service::stop_ticking(state).await;
    events::broadcast_timer_changed(state, &snapshot, None);
}
