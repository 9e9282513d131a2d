//! Single-timer countdown engine and the modes of the focus cycle.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::scheduler::ModeScheduler;

/// Interval kinds of the focus cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    /// Work interval.
    #[default]
    Focus,
    /// Rest interval taken after a regular focus session.
    ShortBreak,
    /// Extended rest taken once enough focus sessions were completed in a row.
    LongBreak,
}

impl TimerMode {
    /// Human readable label used in announcements and logs.
    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Focus => "Focus",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }
}

/// Configured length of every mode, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeDurations {
    /// Focus interval.
    pub focus: u32,
    /// Regular break.
    pub short_break: u32,
    /// Break taken after the long-break threshold.
    pub long_break: u32,
}

impl ModeDurations {
    /// Build durations from whole minutes. Values past `u32::MAX` seconds
    /// saturate.
    pub fn from_minutes(focus: u32, short_break: u32, long_break: u32) -> Self {
        Self {
            focus: focus.saturating_mul(60),
            short_break: short_break.saturating_mul(60),
            long_break: long_break.saturating_mul(60),
        }
    }

    /// Length in seconds of `mode`.
    pub fn for_mode(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Focus => self.focus,
            TimerMode::ShortBreak => self.short_break,
            TimerMode::LongBreak => self.long_break,
        }
    }
}

impl Default for ModeDurations {
    fn default() -> Self {
        Self::from_minutes(25, 5, 15)
    }
}

/// Per-device timer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Mode being counted down.
    pub mode: TimerMode,
    /// Seconds left in the current mode.
    pub time_remaining: u32,
    /// Whether the ticker consumes seconds.
    pub is_running: bool,
    /// Focus sessions completed since the last long break.
    pub consecutive_sessions_count: u32,
    /// Focus sessions that earn a long break.
    pub sessions_until_long_break: u32,
}

/// Result of advancing the clock by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The clock is stopped or already at zero; nothing changed.
    Idle,
    /// One second was consumed and time remains.
    Counted,
    /// The last second was consumed. Reported once per countdown.
    Completed(TimerMode),
}

/// Countdown engine for a single timer.
///
/// The clock never transitions modes on its own: on completion it stops and
/// reports [`Tick::Completed`], leaving the caller to either run the
/// [`ModeScheduler`] (solo timer) or wait for the authoritative session copy
/// (team timer).
#[derive(Debug, Clone)]
pub struct TimerClock {
    state: TimerState,
    durations: ModeDurations,
}

impl TimerClock {
    /// Create a stopped clock in focus mode with a full focus duration.
    pub fn new(durations: ModeDurations, sessions_until_long_break: u32) -> Self {
        Self {
            state: TimerState {
                mode: TimerMode::Focus,
                time_remaining: durations.for_mode(TimerMode::Focus),
                is_running: false,
                consecutive_sessions_count: 0,
                sessions_until_long_break,
            },
            durations,
        }
    }

    /// Current countdown state.
    pub fn state(&self) -> &TimerState {
        &self.state
    }

    /// Durations the clock refills from.
    pub fn durations(&self) -> &ModeDurations {
        &self.durations
    }

    /// Whether the clock counts down.
    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    /// Consume one second if the clock is running and time remains.
    ///
    /// Reaching zero stops the clock, so the completion edge fires exactly
    /// once until a reset, a mode change or an external overwrite.
    pub fn tick(&mut self) -> Tick {
        if !self.state.is_running || self.state.time_remaining == 0 {
            return Tick::Idle;
        }

        self.state.time_remaining -= 1;
        if self.state.time_remaining == 0 {
            self.state.is_running = false;
            return Tick::Completed(self.state.mode);
        }

        Tick::Counted
    }

    /// Start counting down. Returns `false` when nothing changed, which
    /// includes starting an exhausted clock.
    pub fn start(&mut self) -> bool {
        if self.state.is_running || self.state.time_remaining == 0 {
            return false;
        }
        self.state.is_running = true;
        true
    }

    /// Stop counting down. Returns `false` if the clock was already stopped.
    pub fn pause(&mut self) -> bool {
        if !self.state.is_running {
            return false;
        }
        self.state.is_running = false;
        true
    }

    /// Refill the current mode and stop the clock.
    pub fn reset(&mut self) {
        self.state.time_remaining = self.durations.for_mode(self.state.mode);
        self.state.is_running = false;
    }

    /// Manual mode selection. Leaves `is_running` and the session counter alone.
    pub fn set_mode(&mut self, mode: TimerMode) {
        self.state.mode = mode;
        self.state.time_remaining = self.durations.for_mode(mode);
    }

    /// Advance to the next mode after a natural completion.
    pub fn complete(&mut self, scheduler: &ModeScheduler) -> &TimerState {
        self.state = scheduler.complete_session(&self.state);
        &self.state
    }

    /// Replace the countdown with an externally owned copy (team reconciliation).
    pub fn overwrite(&mut self, mode: TimerMode, time_remaining: u32, is_running: bool) {
        self.state.mode = mode;
        self.state.time_remaining = time_remaining;
        self.state.is_running = is_running;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> TimerClock {
        TimerClock::new(ModeDurations::from_minutes(25, 5, 15), 4)
    }

    #[test]
    fn huge_minute_counts_saturate() {
        let durations = ModeDurations::from_minutes(u32::MAX, 5, 15);
        assert_eq!(durations.focus, u32::MAX);
        assert_eq!(durations.short_break, 300);
    }

    #[test]
    fn new_clock_is_stopped_focus() {
        let clock = clock();
        assert_eq!(clock.state().mode, TimerMode::Focus);
        assert_eq!(clock.state().time_remaining, 25 * 60);
        assert!(!clock.is_running());
    }

    #[test]
    fn tick_does_nothing_while_paused() {
        let mut clock = clock();
        assert_eq!(clock.tick(), Tick::Idle);
        assert_eq!(clock.state().time_remaining, 25 * 60);
    }

    #[test]
    fn ticks_are_non_increasing_and_stop_at_zero() {
        let mut clock = TimerClock::new(
            ModeDurations {
                focus: 5,
                short_break: 2,
                long_break: 3,
            },
            4,
        );
        assert!(clock.start());

        let mut previous = clock.state().time_remaining;
        let mut completions = 0;
        for _ in 0..20 {
            if let Tick::Completed(mode) = clock.tick() {
                assert_eq!(mode, TimerMode::Focus);
                completions += 1;
            }
            let current = clock.state().time_remaining;
            assert!(current <= previous);
            previous = current;
        }

        assert_eq!(previous, 0);
        assert_eq!(completions, 1);
        assert!(!clock.is_running());
    }

    #[test]
    fn start_at_zero_is_a_no_op() {
        let mut clock = clock();
        clock.overwrite(TimerMode::Focus, 0, false);
        assert!(!clock.start());
        assert!(!clock.is_running());
    }

    #[test]
    fn pause_then_resume_keeps_remaining_time() {
        let mut clock = clock();
        clock.start();
        clock.tick();
        clock.tick();
        assert!(clock.pause());
        assert!(!clock.pause());
        assert_eq!(clock.state().time_remaining, 25 * 60 - 2);
        assert!(clock.start());
        assert_eq!(clock.state().time_remaining, 25 * 60 - 2);
    }

    #[test]
    fn reset_refills_current_mode_and_stops() {
        let mut clock = clock();
        clock.set_mode(TimerMode::ShortBreak);
        clock.start();
        clock.tick();
        clock.reset();
        assert_eq!(clock.state().time_remaining, 5 * 60);
        assert!(!clock.is_running());
    }

    #[test]
    fn set_mode_preserves_running_flag_and_counter() {
        let mut clock = clock();
        clock.start();
        clock.set_mode(TimerMode::LongBreak);
        assert!(clock.is_running());
        assert_eq!(clock.state().time_remaining, 15 * 60);
        assert_eq!(clock.state().consecutive_sessions_count, 0);
    }

    #[test]
    fn overwrite_rearms_completion() {
        let mut clock = TimerClock::new(
            ModeDurations {
                focus: 1,
                short_break: 1,
                long_break: 1,
            },
            4,
        );
        clock.start();
        assert_eq!(clock.tick(), Tick::Completed(TimerMode::Focus));
        assert_eq!(clock.tick(), Tick::Idle);

        clock.overwrite(TimerMode::ShortBreak, 1, true);
        assert_eq!(clock.tick(), Tick::Completed(TimerMode::ShortBreak));
    }
}
