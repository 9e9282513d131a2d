//! Application state: the local clock, the session cache and their background tasks.

pub mod events;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod timer;

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use tokio::{
    sync::{Mutex, MutexGuard, OwnedMutexGuard, RwLock},
    task::JoinHandle,
};

use crate::{
    config::AppConfig,
    dao::backend::{BackendResult, SessionBackend, bounded},
    services::observer::CompletionObserver,
};

pub use self::events::EventHub;
use self::{
    scheduler::ModeScheduler, session::SessionId, store::TeamSessionStore, timer::TimerClock,
};

/// Handle to the application state shared by handlers and background tasks.
pub type SharedState = Arc<AppState>;

const EVENT_CAPACITY: usize = 64;

/// The team session this device follows, and its poll loop.
pub struct SyncTracking {
    /// Followed session.
    pub session_id: SessionId,
    /// User this device acts as inside the session.
    pub user_id: String,
    /// Last poll sequence issued before tracking began. A later poll that
    /// misses the session proves it was deleted remotely.
    pub tracked_since: u64,
    /// Poll loop handle. Released when the loop closes tracking itself.
    pub task: Option<JoinHandle<()>>,
}

/// Central application state: the local clock, the session cache and the
/// handles of the background tasks that drive them.
pub struct AppState {
    config: AppConfig,
    scheduler: ModeScheduler,
    backend: Arc<dyn SessionBackend>,
    observer: Arc<dyn CompletionObserver>,
    events: EventHub,
    timer: RwLock<TimerClock>,
    store: RwLock<TeamSessionStore>,
    gates: DashMap<SessionId, Arc<Mutex<()>>>,
    tracking: Mutex<Option<SyncTracking>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    poll_issued: AtomicU64,
    poll_applied: Mutex<u64>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn SessionBackend>,
        observer: Arc<dyn CompletionObserver>,
    ) -> SharedState {
        let durations = config.durations();
        Arc::new(Self {
            scheduler: ModeScheduler::new(durations),
            timer: RwLock::new(TimerClock::new(
                durations,
                config.sessions_until_long_break(),
            )),
            config,
            backend,
            observer,
            events: EventHub::new(EVENT_CAPACITY),
            store: RwLock::new(TeamSessionStore::new()),
            gates: DashMap::new(),
            tracking: Mutex::new(None),
            ticker: Mutex::new(None),
            poll_issued: AtomicU64::new(0),
            poll_applied: Mutex::new(0),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Long-break cadence for the local clock.
    pub fn scheduler(&self) -> &ModeScheduler {
        &self.scheduler
    }

    /// Installed session backend.
    pub fn backend(&self) -> &dyn SessionBackend {
        self.backend.as_ref()
    }

    /// Reward and notification sinks.
    pub fn observer(&self) -> &dyn CompletionObserver {
        self.observer.as_ref()
    }

    /// Broadcast hub feeding the `/events` stream.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// The device's clock.
    pub fn timer(&self) -> &RwLock<TimerClock> {
        &self.timer
    }

    /// Local shadow copies of every known team session.
    pub fn store(&self) -> &RwLock<TeamSessionStore> {
        &self.store
    }

    /// Session this device follows, if any.
    pub fn tracking(&self) -> &Mutex<Option<SyncTracking>> {
        &self.tracking
    }

    /// Slot holding the one-second ticker task, when it runs.
    pub fn ticker(&self) -> &Mutex<Option<JoinHandle<()>>> {
        &self.ticker
    }

    /// Take the single-writer gate of `id`.
    ///
    /// Coordinator mutations and reconciliations of the same session run one
    /// at a time; distinct sessions never contend.
    pub async fn lock_session(&self, id: &SessionId) -> OwnedMutexGuard<()> {
        let gate = self
            .gates
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        gate.lock_owned().await
    }

    /// Drop the gate of a session that no longer exists.
    pub fn forget_session(&self, id: &SessionId) {
        self.gates.remove(id);
    }

    /// Stamp a new poll.
    pub fn next_poll_sequence(&self) -> u64 {
        self.poll_issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Sequence of the most recently issued poll.
    pub fn last_poll_sequence(&self) -> u64 {
        self.poll_issued.load(Ordering::SeqCst)
    }

    /// Sequence of the last reconciliation that was applied. Holding the
    /// guard serialises reconciliations.
    pub async fn applied_polls(&self) -> MutexGuard<'_, u64> {
        self.poll_applied.lock().await
    }

    /// Run a backend call bounded by the configured request timeout.
    pub async fn remote<T, F>(&self, call: F) -> BackendResult<T>
    where
        F: Future<Output = BackendResult<T>>,
    {
        bounded(self.config.request_timeout(), call).await
    }
}
