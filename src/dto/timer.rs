//! Local timer request bodies.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::state::timer::TimerMode;

/// Manual mode selection for the local timer.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimerModeRequest {
    /// Mode to switch to.
    pub mode: TimerMode,
}
