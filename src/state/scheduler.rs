//! Long-break cadence.

use crate::state::timer::{ModeDurations, TimerMode, TimerState};

/// Decides which mode follows a naturally completed one.
///
/// Every completed focus session bumps the consecutive counter; once it
/// reaches the configured threshold the next break is a long one and the
/// counter starts over.
#[derive(Debug, Clone, Copy)]
pub struct ModeScheduler {
    durations: ModeDurations,
}

impl ModeScheduler {
    /// Scheduler refilling modes from `durations`.
    pub fn new(durations: ModeDurations) -> Self {
        Self { durations }
    }

    /// Mode and counter that follow completing `mode` with `count` focus
    /// sessions already behind.
    pub fn next_mode(
        mode: TimerMode,
        count: u32,
        sessions_until_long_break: u32,
    ) -> (TimerMode, u32) {
        match mode {
            TimerMode::Focus => {
                let count = count.saturating_add(1);
                if count >= sessions_until_long_break {
                    (TimerMode::LongBreak, 0)
                } else {
                    (TimerMode::ShortBreak, count)
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => (TimerMode::Focus, count),
        }
    }

    /// Pure transition applied when `current` runs out.
    ///
    /// The returned state is stopped with a full duration for the new mode.
    pub fn complete_session(&self, current: &TimerState) -> TimerState {
        let (mode, consecutive_sessions_count) = Self::next_mode(
            current.mode,
            current.consecutive_sessions_count,
            current.sessions_until_long_break,
        );

        TimerState {
            mode,
            time_remaining: self.durations.for_mode(mode),
            is_running: false,
            consecutive_sessions_count,
            sessions_until_long_break: current.sessions_until_long_break,
        }
    }
}
