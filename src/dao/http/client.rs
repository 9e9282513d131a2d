//! reqwest implementation of [`SessionBackend`](crate::dao::backend::SessionBackend).

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};

use crate::{
    dao::backend::{BackendError, BackendResult, SessionBackend},
    state::session::{SessionId, SessionUpdate, TeamSession, TeamSessionParticipant},
};

use super::{
    config::HttpBackendConfig,
    error::{HttpBackendError, HttpResult},
};

const SESSIONS: &str = "sessions";

/// JSON-over-HTTP client for a remote session backend.
#[derive(Clone)]
pub struct HttpSessionBackend {
    client: Client,
    base_url: Arc<Url>,
    token: Option<Arc<str>>,
}

impl HttpSessionBackend {
    /// Build the client. Every request is bounded by the configured timeout.
    pub fn new(config: HttpBackendConfig) -> HttpResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| HttpBackendError::ClientBuilder { source })?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| HttpBackendError::InvalidBaseUrl {
                url: config.base_url.clone(),
            })?;

        Ok(Self {
            client,
            base_url: Arc::new(base_url),
            token: config.token.map(Arc::from),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = (*self.base_url).clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> (String, RequestBuilder) {
        let url = self.url(segments);
        let path = url.path().to_string();
        let builder = self.client.request(method, url);
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        (path, builder)
    }

    /// Send `builder` and map the status code. A 404 on a session-scoped
    /// path means the backend no longer knows `session`.
    async fn execute(
        path: String,
        builder: RequestBuilder,
        session: Option<&SessionId>,
    ) -> BackendResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| HttpBackendError::RequestSend {
                path: path.clone(),
                source,
            })?;

        match (response.status(), session) {
            (status, _) if status.is_success() => Ok(response),
            (StatusCode::NOT_FOUND, Some(id)) => Err(BackendError::NotFound(id.clone())),
            (status, _) => Err(HttpBackendError::RequestStatus { path, status }.into()),
        }
    }
}

impl SessionBackend for HttpSessionBackend {
    fn create_session(&self, session: TeamSession) -> BoxFuture<'static, BackendResult<()>> {
        let (path, builder) = self.request(Method::POST, &[SESSIONS]);
        Box::pin(async move {
            Self::execute(path, builder.json(&session), None).await?;
            Ok(())
        })
    }

    fn join_session(
        &self,
        id: SessionId,
        participant: TeamSessionParticipant,
    ) -> BoxFuture<'static, BackendResult<()>> {
        let (path, builder) = self.request(Method::POST, &[SESSIONS, id.as_str(), "participants"]);
        Box::pin(async move {
            Self::execute(path, builder.json(&participant), Some(&id)).await?;
            Ok(())
        })
    }

    fn leave_session(
        &self,
        id: SessionId,
        user_id: String,
    ) -> BoxFuture<'static, BackendResult<()>> {
        let (path, builder) = self.request(
            Method::DELETE,
            &[SESSIONS, id.as_str(), "participants", &user_id],
        );
        Box::pin(async move {
            Self::execute(path, builder, Some(&id)).await?;
            Ok(())
        })
    }

    fn delete_session(&self, id: SessionId) -> BoxFuture<'static, BackendResult<()>> {
        let (path, builder) = self.request(Method::DELETE, &[SESSIONS, id.as_str()]);
        Box::pin(async move {
            Self::execute(path, builder, Some(&id)).await?;
            Ok(())
        })
    }

    fn apply_update(
        &self,
        id: SessionId,
        update: SessionUpdate,
    ) -> BoxFuture<'static, BackendResult<()>> {
        let (path, builder) = self.request(Method::POST, &[SESSIONS, id.as_str(), "updates"]);
        Box::pin(async move {
            Self::execute(path, builder.json(&update), Some(&id)).await?;
            Ok(())
        })
    }

    fn list_sessions(&self) -> BoxFuture<'static, BackendResult<Vec<TeamSession>>> {
        let (path, builder) = self.request(Method::GET, &[SESSIONS]);
        Box::pin(async move {
            let response = Self::execute(path.clone(), builder, None).await?;
            let sessions = response
                .json::<Vec<TeamSession>>()
                .await
                .map_err(|source| HttpBackendError::DecodeResponse { path, source })?;
            Ok(sessions)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, BackendResult<()>> {
        let (path, builder) = self.request(Method::GET, &["health"]);
        Box::pin(async move {
            Self::execute(path, builder, None).await?;
            Ok(())
        })
    }
}
