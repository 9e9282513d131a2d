#![allow(dead_code)]

use std::sync::Arc;

use focus_crew::{
    config::AppConfig,
    dao::memory::MemorySessionBackend,
    dto::events::ServerEvent,
    services::observer::LoggingObserver,
    state::{AppState, SharedState, session::Profile, timer::ModeDurations},
};
use tokio::sync::broadcast;

pub const DURATIONS: ModeDurations = ModeDurations {
    focus: 3,
    short_break: 2,
    long_break: 4,
};
pub const SESSIONS_UNTIL_LONG_BREAK: u32 = 4;

/// Authoritative backend shared by every simulated device.
pub fn backend() -> Arc<MemorySessionBackend> {
    Arc::new(MemorySessionBackend::new(
        DURATIONS,
        SESSIONS_UNTIL_LONG_BREAK,
    ))
}

/// One client device talking to `backend`.
pub fn device(backend: &Arc<MemorySessionBackend>) -> SharedState {
    let config = AppConfig::default()
        .with_durations(DURATIONS)
        .with_sessions_until_long_break(SESSIONS_UNTIL_LONG_BREAK);
    AppState::new(config, backend.clone(), Arc::new(LoggingObserver))
}

pub fn profile(id: &str, name: &str) -> Profile {
    Profile::new(id, name, format!("{id}.png"))
}

/// Names of every event received so far.
pub fn drain_event_names(receiver: &mut broadcast::Receiver<ServerEvent>) -> Vec<String> {
    let mut names = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let Some(name) = event.event {
            names.push(name);
        }
    }
    names
}
