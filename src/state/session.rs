//! Team session entities shared by the local cache and the backends.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    scheduler::ModeScheduler,
    timer::{ModeDurations, TimerMode, TimerState},
};

/// Sender id reserved for announcements generated by the system.
pub const SYSTEM_SENDER_ID: &str = "system";

/// Alphabet for session codes; visually ambiguous characters are left out.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

/// Human-shareable team session code.
///
/// Codes are normalised (trimmed, uppercased) whenever they are built from
/// user input so `" abc123"` and `"ABC123"` address the same session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(from = "String", into = "String")]
#[schema(value_type = String, example = "K7QX2M")]
pub struct SessionId(String);

impl SessionId {
    /// Draw a fresh random code.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Build a code from loosely typed user input.
    pub fn from_code(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    /// The normalised code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self::from_code(&value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::from_code(value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

/// Identity of a user as shown to the other participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Stable user id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Avatar reference understood by the UI.
    pub avatar: String,
}

impl Profile {
    /// Build a profile from its three parts.
    pub fn new(id: impl Into<String>, name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: avatar.into(),
        }
    }
}

/// Member of a team session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamSessionParticipant {
    /// User id, unique within the session.
    pub id: String,
    /// Display name at join time.
    pub name: String,
    /// Avatar reference.
    pub avatar: String,
    /// Cleared whenever a new mode cycle starts.
    pub is_ready: bool,
    /// Liveness of the participant's device.
    pub is_active: bool,
    /// When the participant joined.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub joined_at: OffsetDateTime,
}

impl TeamSessionParticipant {
    /// Fresh participant: active, not ready.
    pub fn joining(profile: Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            avatar: profile.avatar,
            is_ready: false,
            is_active: true,
            joined_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Immutable chat entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique message id; duplicates are dropped on append.
    pub id: Uuid,
    /// Author id, or [`SYSTEM_SENDER_ID`] for announcements.
    pub sender_id: String,
    /// Author display name.
    pub sender_name: String,
    /// Author avatar reference.
    pub sender_avatar: String,
    /// Message body.
    pub text: String,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: OffsetDateTime,
}

impl ChatMessage {
    /// Message written by `sender`, stamped now.
    pub fn new(sender: &Profile, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: sender.id.clone(),
            sender_name: sender.name.clone(),
            sender_avatar: sender.avatar.clone(),
            text: text.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Announcement authored by [`SYSTEM_SENDER_ID`].
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: SYSTEM_SENDER_ID.into(),
            sender_name: "System".into(),
            sender_avatar: String::new(),
            text: text.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Whether the system authored this message.
    pub fn is_system(&self) -> bool {
        self.sender_id == SYSTEM_SENDER_ID
    }
}

/// Shared group timer with its members and chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamSession {
    /// Shareable session code.
    pub id: SessionId,
    /// Participant holding host privileges. Never reassigned.
    pub host_id: String,
    /// Display label.
    pub name: String,
    /// Mode of the group timer.
    pub current_mode: TimerMode,
    /// Seconds left in the current mode.
    pub time_remaining: u32,
    /// Whether the group timer counts down.
    pub is_running: bool,
    /// Join order.
    pub participants: Vec<TeamSessionParticipant>,
    /// Chronological.
    pub messages: Vec<ChatMessage>,
    /// Whether the voice side-channel is on.
    pub voice_chat_enabled: bool,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    /// Focus cycles completed since the group's last long break. Maintained by
    /// the authoritative backend.
    #[serde(default)]
    pub consecutive_sessions_count: u32,
}

/// A participant-scoped update targeted a user who is not in the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("user `{user_id}` is not a participant of session `{session_id}`")]
pub struct UnknownParticipant {
    /// Session that was targeted.
    pub session_id: SessionId,
    /// Id that is not a member.
    pub user_id: String,
}

/// Mutation requested against a team session.
///
/// Clients apply these optimistically to their shadow copy and send the same
/// value to the backend, which applies it to the authoritative record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionUpdate {
    /// Readiness toggle of one participant.
    #[serde(rename_all = "camelCase")]
    Ready {
        /// Participant id.
        user_id: String,
        /// New readiness.
        ready: bool,
    },
    /// Liveness toggle of one participant.
    #[serde(rename_all = "camelCase")]
    Activity {
        /// Participant id.
        user_id: String,
        /// New liveness.
        active: bool,
    },
    /// Start or pause the group timer.
    #[serde(rename_all = "camelCase")]
    Running {
        /// Whether the timer should run.
        is_running: bool,
    },
    /// Switch mode with a full duration; clears every readiness flag.
    #[serde(rename_all = "camelCase")]
    Mode {
        /// Target mode.
        mode: TimerMode,
        /// Countdown for the target mode, in seconds.
        time_remaining: u32,
    },
    /// Append a chat entry.
    Message {
        /// Entry to append.
        message: ChatMessage,
    },
    /// Turn the voice side-channel on or off.
    VoiceChat {
        /// New voice chat state.
        enabled: bool,
    },
}

impl SessionUpdate {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionUpdate::Ready { .. } => "ready",
            SessionUpdate::Activity { .. } => "activity",
            SessionUpdate::Running { .. } => "running",
            SessionUpdate::Mode { .. } => "mode",
            SessionUpdate::Message { .. } => "message",
            SessionUpdate::VoiceChat { .. } => "voice_chat",
        }
    }
}

impl TeamSession {
    /// New session with `host` as its only participant, stopped in focus mode.
    pub fn new(
        id: SessionId,
        name: String,
        host: Profile,
        durations: &ModeDurations,
        voice_chat_enabled: bool,
    ) -> Self {
        Self {
            id,
            host_id: host.id.clone(),
            name,
            current_mode: TimerMode::Focus,
            time_remaining: durations.for_mode(TimerMode::Focus),
            is_running: false,
            participants: vec![TeamSessionParticipant::joining(host)],
            messages: Vec::new(),
            voice_chat_enabled,
            created_at: OffsetDateTime::now_utc(),
            consecutive_sessions_count: 0,
        }
    }

    /// Host privileges hold only while the host is still a participant; a
    /// departed host controls nothing.
    pub fn is_host(&self, user_id: &str) -> bool {
        self.host_id == user_id && self.is_participant(user_id)
    }

    /// Member entry of `user_id`, if any.
    pub fn participant(&self, user_id: &str) -> Option<&TeamSessionParticipant> {
        self.participants.iter().find(|p| p.id == user_id)
    }

    /// Mutable member entry of `user_id`, if any.
    pub fn participant_mut(&mut self, user_id: &str) -> Option<&mut TeamSessionParticipant> {
        self.participants.iter_mut().find(|p| p.id == user_id)
    }

    /// Whether `user_id` is a member.
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participant(user_id).is_some()
    }

    /// Add `participant` unless a member with the same id exists already.
    /// Returns whether the list changed.
    pub fn add_participant(&mut self, participant: TeamSessionParticipant) -> bool {
        if self.is_participant(&participant.id) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    /// Remove `user_id` and return its entry.
    pub fn remove_participant(&mut self, user_id: &str) -> Option<TeamSessionParticipant> {
        let index = self.participants.iter().position(|p| p.id == user_id)?;
        Some(self.participants.remove(index))
    }

    /// Readiness gate: every current participant has confirmed.
    pub fn all_ready(&self) -> bool {
        self.participants.iter().all(|p| p.is_ready)
    }

    /// Members whose device is live.
    pub fn active_participant_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_active).count()
    }

    /// Reset every readiness flag for a new cycle.
    pub fn clear_ready(&mut self) {
        for participant in &mut self.participants {
            participant.is_ready = false;
        }
    }

    /// Append `message`; a message id already present is ignored so retried
    /// deliveries do not duplicate chat entries.
    pub fn push_message(&mut self, message: ChatMessage) {
        if self.messages.iter().any(|m| m.id == message.id) {
            return;
        }
        self.messages.push(message);
    }

    /// Apply an update to this copy of the session.
    pub fn apply(&mut self, update: &SessionUpdate) -> Result<(), UnknownParticipant> {
        match update {
            SessionUpdate::Ready { user_id, ready } => {
                self.require_participant(user_id)?.is_ready = *ready;
            }
            SessionUpdate::Activity { user_id, active } => {
                self.require_participant(user_id)?.is_active = *active;
            }
            SessionUpdate::Running { is_running } => self.is_running = *is_running,
            SessionUpdate::Mode {
                mode,
                time_remaining,
            } => {
                self.current_mode = *mode;
                self.time_remaining = *time_remaining;
                self.clear_ready();
            }
            SessionUpdate::Message { message } => self.push_message(message.clone()),
            SessionUpdate::VoiceChat { enabled } => self.voice_chat_enabled = *enabled,
        }
        Ok(())
    }

    /// Group timer projected onto the single-timer state shape.
    pub fn timer_state(&self, sessions_until_long_break: u32) -> TimerState {
        TimerState {
            mode: self.current_mode,
            time_remaining: self.time_remaining,
            is_running: self.is_running,
            consecutive_sessions_count: self.consecutive_sessions_count,
            sessions_until_long_break,
        }
    }

    /// Move the group to the mode that follows a natural completion.
    ///
    /// Readiness is cleared for the new cycle and the change is announced in
    /// the chat. Returns the mode that just finished.
    pub fn advance_cycle(
        &mut self,
        scheduler: &ModeScheduler,
        sessions_until_long_break: u32,
    ) -> TimerMode {
        let finished = self.current_mode;
        let next = scheduler.complete_session(&self.timer_state(sessions_until_long_break));

        self.current_mode = next.mode;
        self.time_remaining = next.time_remaining;
        self.is_running = next.is_running;
        self.consecutive_sessions_count = next.consecutive_sessions_count;
        self.clear_ready();
        self.push_message(ChatMessage::system(format!(
            "{} finished. Next up: {}.",
            finished.label(),
            next.mode.label()
        )));

        finished
    }

    fn require_participant(
        &mut self,
        user_id: &str,
    ) -> Result<&mut TeamSessionParticipant, UnknownParticipant> {
        let session_id = self.id.clone();
        self.participant_mut(user_id)
            .ok_or_else(|| UnknownParticipant {
                session_id,
                user_id: user_id.to_string(),
            })
    }
}
