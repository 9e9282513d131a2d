//! Backend reachability report.

use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the session backend answers; the local timer works either way.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.remote(state.backend().health_check()).await {
        Ok(()) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "session backend health check failed");
            HealthResponse::degraded()
        }
    }
}
