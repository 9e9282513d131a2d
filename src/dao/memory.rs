//! In-process authoritative session backend.
//!
//! Owns the canonical copy of every team session, runs the group countdown
//! and applies the mode cycle when a running session reaches zero. Serves
//! offline use and the test-suite.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use futures::future::{self, BoxFuture, FutureExt};
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::{
    dao::backend::{BackendError, BackendResult, SessionBackend},
    state::{
        scheduler::ModeScheduler,
        session::{SessionId, SessionUpdate, TeamSession, TeamSessionParticipant},
        timer::{ModeDurations, TimerMode},
    },
};

const CLOCK_INTERVAL: Duration = Duration::from_secs(1);

/// Raised when the backend is switched offline.
#[derive(Debug, thiserror::Error)]
#[error("memory backend is offline")]
struct Offline;

/// Canonical sessions held in process memory.
pub struct MemorySessionBackend {
    sessions: DashMap<SessionId, TeamSession>,
    scheduler: ModeScheduler,
    sessions_until_long_break: u32,
    online: AtomicBool,
}

impl MemorySessionBackend {
    /// Empty, online backend cycling modes with `durations`.
    pub fn new(durations: ModeDurations, sessions_until_long_break: u32) -> Self {
        Self {
            sessions: DashMap::new(),
            scheduler: ModeScheduler::new(durations),
            sessions_until_long_break,
            online: AtomicBool::new(true),
        }
    }

    /// Simulate connectivity loss: every call fails while offline.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Copy of the canonical record.
    pub fn session(&self, id: &SessionId) -> Option<TeamSession> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Run every running session's countdown forward by `seconds`.
    ///
    /// A session that reaches zero moves to its next mode (stopped, readiness
    /// cleared); leftover seconds are not carried into the next mode.
    pub fn advance(&self, seconds: u32) -> Vec<(SessionId, TimerMode)> {
        let mut completed = Vec::new();
        for mut entry in self.sessions.iter_mut() {
            let session = entry.value_mut();
            if !session.is_running {
                continue;
            }

            session.time_remaining = session.time_remaining.saturating_sub(seconds);
            if session.time_remaining == 0 {
                let finished =
                    session.advance_cycle(&self.scheduler, self.sessions_until_long_break);
                debug!(
                    session_id = %session.id,
                    finished = finished.label(),
                    next = session.current_mode.label(),
                    "team cycle completed"
                );
                completed.push((session.id.clone(), finished));
            }
        }
        completed
    }

    /// Force the current mode of `id` to finish now.
    pub fn complete_current(&self, id: &SessionId) -> Option<TimerMode> {
        let mut entry = self.sessions.get_mut(id)?;
        entry.advance_cycle(&self.scheduler, self.sessions_until_long_break);
        Some(entry.current_mode)
    }

    /// Drive [`Self::advance`] once per second until the handle is aborted.
    pub fn spawn_clock(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = time::interval(CLOCK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;
            loop {
                interval.tick().await;
                self.advance(1);
            }
        })
    }

    fn check_online(&self) -> BackendResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::unavailable("in-process backend".into(), Offline))
        }
    }

    fn with_session<T>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut TeamSession) -> BackendResult<T>,
    ) -> BackendResult<T> {
        self.check_online()?;
        let mut entry = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(id.clone()))?;
        f(entry.value_mut())
    }
}

fn ready<T: Send + 'static>(result: BackendResult<T>) -> BoxFuture<'static, BackendResult<T>> {
    future::ready(result).boxed()
}

impl SessionBackend for MemorySessionBackend {
    fn create_session(&self, session: TeamSession) -> BoxFuture<'static, BackendResult<()>> {
        let result = self.check_online().and_then(|()| {
            if self.sessions.contains_key(&session.id) {
                return Err(BackendError::Rejected(format!(
                    "session code `{}` already in use",
                    session.id
                )));
            }
            info!(session_id = %session.id, name = %session.name, "session registered");
            self.sessions.insert(session.id.clone(), session);
            Ok(())
        });
        ready(result)
    }

    fn join_session(
        &self,
        id: SessionId,
        participant: TeamSessionParticipant,
    ) -> BoxFuture<'static, BackendResult<()>> {
        ready(self.with_session(&id, |session| {
            session.add_participant(participant);
            Ok(())
        }))
    }

    fn leave_session(
        &self,
        id: SessionId,
        user_id: String,
    ) -> BoxFuture<'static, BackendResult<()>> {
        ready(self.with_session(&id, |session| {
            session.remove_participant(&user_id);
            Ok(())
        }))
    }

    fn delete_session(&self, id: SessionId) -> BoxFuture<'static, BackendResult<()>> {
        let result = self.check_online().and_then(|()| {
            self.sessions
                .remove(&id)
                .map(|_| ())
                .ok_or(BackendError::NotFound(id))
        });
        ready(result)
    }

    fn apply_update(
        &self,
        id: SessionId,
        update: SessionUpdate,
    ) -> BoxFuture<'static, BackendResult<()>> {
        ready(self.with_session(&id, |session| {
            session
                .apply(&update)
                .map_err(|err| BackendError::Rejected(err.to_string()))
        }))
    }

    fn list_sessions(&self) -> BoxFuture<'static, BackendResult<Vec<TeamSession>>> {
        let result = self.check_online().map(|()| {
            let mut sessions: Vec<TeamSession> =
                self.sessions.iter().map(|entry| entry.value().clone()).collect();
            sessions.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
            sessions
        });
        ready(result)
    }

    fn health_check(&self) -> BoxFuture<'static, BackendResult<()>> {
        ready(self.check_online())
    }
}
