//! Team session request and response bodies.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::state::{
    session::{Profile, TeamSession},
    timer::TimerMode,
};

/// Identity a user acts under.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    /// Stable user id.
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    /// Display name.
    #[validate(length(min = 1, max = 40))]
    pub name: String,
    /// Avatar reference (asset name or URL).
    #[serde(default)]
    #[validate(length(max = 256))]
    pub avatar: String,
}

impl From<ProfileInput> for Profile {
    fn from(value: ProfileInput) -> Self {
        Profile::new(value.id, value.name, value.avatar)
    }
}

/// Payload for opening a new team session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Display label; trimmed and shortened to 60 characters.
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Creator, who becomes host and first participant.
    #[validate(nested)]
    pub host: ProfileInput,
    /// Initial voice chat state.
    #[serde(default)]
    pub voice_chat_enabled: bool,
}

/// Request naming the user performing an action.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRequest {
    /// Acting user.
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
}

/// Requester of a host-only action carried in the query string.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RequesterQuery {
    /// Acting user.
    #[validate(length(min = 1, max = 64))]
    pub requester_id: String,
}

/// Readiness toggle of a participant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReadyRequest {
    /// Participant id.
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    /// New readiness.
    pub ready: bool,
}

/// Liveness toggle of a participant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRequest {
    /// Participant id.
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    /// New liveness.
    pub active: bool,
}

/// Host request to switch the group timer's mode.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionModeRequest {
    /// Acting user; must be the host.
    #[validate(length(min = 1, max = 64))]
    pub requester_id: String,
    /// Target mode.
    pub mode: TimerMode,
}

/// Chat message posted by a participant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Author.
    #[validate(nested)]
    pub sender: ProfileInput,
    /// Body; trimmed, at most 500 characters.
    #[validate(length(min = 1))]
    pub text: String,
}

/// Outcome of a start request; `started` is false when the readiness gate
/// held the timer back.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    /// Whether the timer now runs.
    pub started: bool,
    /// Local copy after the request.
    pub session: TeamSession,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_validates_nested_host() {
        let request: CreateSessionRequest = serde_json::from_str(
            r#"{ "name": "Morning Focus", "host": { "id": "", "name": "Hana" } }"#,
        )
        .unwrap();
        assert!(!request.voice_chat_enabled);
        assert!(request.validate().is_err());

        let request: CreateSessionRequest = serde_json::from_str(
            r#"{ "name": "Morning Focus", "host": { "id": "h1", "name": "Hana", "avatar": "fox" }, "voiceChatEnabled": true }"#,
        )
        .unwrap();
        assert!(request.voice_chat_enabled);
        assert!(request.validate().is_ok());
    }
}
