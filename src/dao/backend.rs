use std::{error::Error, future::Future, time::Duration};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::time::timeout;

use crate::state::session::{SessionId, SessionUpdate, TeamSession, TeamSessionParticipant};

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Error raised by session backends regardless of the transport behind them.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport or service failure.
    #[error("session backend unavailable: {message}")]
    Unavailable {
        /// Which backend failed.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The call outlived the request timeout.
    #[error("session backend did not answer within {0:?}")]
    Timeout(Duration),
    /// The backend holds no such session.
    #[error("session `{0}` unknown to the backend")]
    NotFound(SessionId),
    /// The backend refused the request.
    #[error("session backend rejected the request: {0}")]
    Rejected(String),
}

impl BackendError {
    /// Construct an unavailable error from any transport failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        BackendError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Authoritative owner of team sessions.
///
/// Clients never hold the canonical record: they push requests through this
/// seam and periodically read back [`SessionBackend::list_sessions`].
pub trait SessionBackend: Send + Sync {
    /// Register a freshly created session.
    fn create_session(&self, session: TeamSession) -> BoxFuture<'static, BackendResult<()>>;
    /// Add `participant`; joining twice is a no-op.
    fn join_session(
        &self,
        id: SessionId,
        participant: TeamSessionParticipant,
    ) -> BoxFuture<'static, BackendResult<()>>;
    /// Remove `user_id` from the session.
    fn leave_session(&self, id: SessionId, user_id: String)
    -> BoxFuture<'static, BackendResult<()>>;
    /// Drop the session for everyone.
    fn delete_session(&self, id: SessionId) -> BoxFuture<'static, BackendResult<()>>;
    /// Apply one mutation to the canonical record.
    fn apply_update(
        &self,
        id: SessionId,
        update: SessionUpdate,
    ) -> BoxFuture<'static, BackendResult<()>>;
    /// Every session the backend knows, polled by the sync loop.
    fn list_sessions(&self) -> BoxFuture<'static, BackendResult<Vec<TeamSession>>>;
    /// Cheap reachability probe.
    fn health_check(&self) -> BoxFuture<'static, BackendResult<()>>;
}

/// Bound a backend call by `limit`; running out of time is an ordinary failure.
pub async fn bounded<T, F>(limit: Duration, call: F) -> BackendResult<T>
where
    F: Future<Output = BackendResult<T>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(limit)),
    }
}
