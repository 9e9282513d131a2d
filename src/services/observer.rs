//! Fire-and-forget sinks notified when a countdown finishes.

use tracing::info;

use crate::state::timer::TimerMode;

/// Payload handed to the reward sink after a focus interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusCompletion {
    /// Configured focus length.
    pub duration_minutes: u32,
    /// Whether the interval belonged to a team session.
    pub is_team_session: bool,
    /// Live participants at completion, 1 when solo.
    pub active_participant_count: usize,
}

/// Side-effect sink for completions (rewards, notifications, sound).
///
/// Calls are synchronous and must not block; implementations hand the work to
/// their own channel or task when it is expensive. Nothing they return is
/// consumed.
pub trait CompletionObserver: Send + Sync {
    /// A focus interval ran to zero.
    fn focus_completed(&self, completion: FocusCompletion);
    /// Any mode ran to zero.
    fn mode_completed(&self, mode: TimerMode);
}

/// Default sink that only records completions in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl CompletionObserver for LoggingObserver {
    fn focus_completed(&self, completion: FocusCompletion) {
        info!(
            duration_minutes = completion.duration_minutes,
            is_team_session = completion.is_team_session,
            active_participants = completion.active_participant_count,
            "focus session completed"
        );
    }

    fn mode_completed(&self, mode: TimerMode) {
        info!(mode = mode.label(), "timer completed");
    }
}
