//! Local timer controls and the one-second ticker driving [`TimerClock`].
//!
//! [`TimerClock`]: crate::state::timer::TimerClock

use std::time::Duration;

use tokio::{
    task::{self, JoinHandle},
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::{
    error::ServiceError,
    services::{
        events,
        observer::FocusCompletion,
        sync_agent,
    },
    state::{
        SharedState,
        session::TeamSession,
        timer::{Tick, TimerMode, TimerState},
    },
};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Current state of the local clock.
pub async fn snapshot(state: &SharedState) -> TimerState {
    state.timer().read().await.state().clone()
}

/// Start the solo timer.
pub async fn start(state: &SharedState) -> Result<TimerState, ServiceError> {
    ensure_solo(state).await?;
    let (started, snapshot) = {
        let mut clock = state.timer().write().await;
        let started = clock.start();
        (started, clock.state().clone())
    };

    if started {
        ensure_ticking(state).await;
        events::broadcast_timer_changed(state, &snapshot, None);
    }
    Ok(snapshot)
}

/// Pause the solo timer.
pub async fn pause(state: &SharedState) -> Result<TimerState, ServiceError> {
    ensure_solo(state).await?;
    let (paused, snapshot) = {
        let mut clock = state.timer().write().await;
        let paused = clock.pause();
        (paused, clock.state().clone())
    };

    if paused {
        events::broadcast_timer_changed(state, &snapshot, None);
    }
    Ok(snapshot)
}

/// Refill the current mode and stop.
pub async fn reset(state: &SharedState) -> Result<TimerState, ServiceError> {
    ensure_solo(state).await?;
    let snapshot = {
        let mut clock = state.timer().write().await;
        clock.reset();
        clock.state().clone()
    };
    events::broadcast_timer_changed(state, &snapshot, None);
    Ok(snapshot)
}

/// Manual mode selection; the focus counter is left untouched.
pub async fn set_mode(state: &SharedState, mode: TimerMode) -> Result<TimerState, ServiceError> {
    ensure_solo(state).await?;
    let snapshot = {
        let mut clock = state.timer().write().await;
        clock.set_mode(mode);
        clock.state().clone()
    };
    events::broadcast_timer_changed(state, &snapshot, None);
    Ok(snapshot)
}

/// Make the local clock follow `session`.
pub async fn mirror_session(state: &SharedState, session: &TeamSession) {
    let (changed, snapshot) = {
        let mut clock = state.timer().write().await;
        let before = clock.state().clone();
        clock.overwrite(
            session.current_mode,
            session.time_remaining,
            session.is_running,
        );
        (before != *clock.state(), clock.state().clone())
    };

    if snapshot.is_running {
        ensure_ticking(state).await;
    }
    if changed {
        events::broadcast_timer_changed(state, &snapshot, Some(&session.id));
    }
}

/// Spawn the ticker unless one is already running.
pub async fn ensure_ticking(state: &SharedState) {
    let mut slot = state.ticker().lock().await;
    if slot.is_some() {
        return;
    }
    *slot = Some(spawn_ticker(state.clone()));
    debug!("timer ticker started");
}

/// Abort the ticker, if any.
pub async fn stop_ticking(state: &SharedState) {
    let handle = state.ticker().lock().await.take();
    if let Some(handle) = handle {
        handle.abort();
        debug!("timer ticker stopped");
    }
}

fn spawn_ticker(state: SharedState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.tick().await;

        loop {
            interval.tick().await;
            if tick_once(&state).await {
                continue;
            }

            // Retire under the slot lock so a concurrent `ensure_ticking`
            // either sees this task still registered or finds the slot empty.
            let mut slot = state.ticker().lock().await;
            if state.timer().read().await.is_running() {
                continue;
            }
            if slot.as_ref().is_some_and(|handle| handle.id() == task::id()) {
                slot.take();
            }
            debug!("timer ticker idle");
            break;
        }
    })
}

/// Advance the clock by one second. Returns whether it is still running.
async fn tick_once(state: &SharedState) -> bool {
    let (tick, snapshot) = {
        let mut clock = state.timer().write().await;
        let tick = clock.tick();
        (tick, clock.state().clone())
    };

    match tick {
        Tick::Idle => false,
        Tick::Counted => {
            let tracked = sync_agent::tracked_session(state).await;
            events::broadcast_timer_changed(state, &snapshot, tracked.as_ref());
            true
        }
        Tick::Completed(mode) => {
            handle_completion(state, mode).await;
            false
        }
    }
}

/// Notify the sinks and, for a solo timer, move to the next mode.
///
/// A team timer keeps its finished mode: the backend owns the group cycle and
/// the next reconciliation brings the new mode in.
async fn handle_completion(state: &SharedState, mode: TimerMode) {
    let tracked = sync_agent::tracked_session(state).await;
    let is_team_session = tracked.is_some();

    if mode == TimerMode::Focus {
        let active_participant_count = match &tracked {
            Some(id) => state
                .store()
                .read()
                .await
                .get(id)
                .map(|session| session.active_participant_count())
                .unwrap_or(1),
            None => 1,
        };
        state.observer().focus_completed(FocusCompletion {
            duration_minutes: state.config().durations().focus / 60,
            is_team_session,
            active_participant_count,
        });
    }
    state.observer().mode_completed(mode);
    events::broadcast_timer_completed(state, mode, is_team_session);

    let snapshot = {
        let mut clock = state.timer().write().await;
        if !is_team_session {
            clock.complete(state.scheduler());
        }
        clock.state().clone()
    };
    info!(
        finished = mode.label(),
        next = snapshot.mode.label(),
        is_team_session,
        "countdown completed"
    );
    events::broadcast_timer_changed(state, &snapshot, tracked.as_ref());
}

async fn ensure_solo(state: &SharedState) -> Result<(), ServiceError> {
    match sync_agent::tracked_session(state).await {
        Some(id) => Err(ServiceError::Forbidden(format!(
            "timer is driven by team session `{id}`"
        ))),
        None => Ok(()),
    }
}
