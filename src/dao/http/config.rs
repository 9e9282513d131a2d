//! Connection settings for the HTTP session backend.

use std::time::Duration;

use super::error::{HttpBackendError, HttpResult};

const BACKEND_URL_ENV: &str = "FOCUS_CREW_BACKEND_URL";
const BACKEND_TOKEN_ENV: &str = "FOCUS_CREW_BACKEND_TOKEN";

/// Runtime configuration describing how to reach the session backend.
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Root URL; resource paths are appended to it.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Optional bearer token.
    pub token: Option<String>,
}

impl HttpBackendConfig {
    /// Configuration without authentication.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout,
            token: None,
        }
    }

    /// Attach a bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build a configuration from `FOCUS_CREW_BACKEND_URL` (required) and
    /// `FOCUS_CREW_BACKEND_TOKEN` (optional).
    pub fn from_env(request_timeout: Duration) -> HttpResult<Self> {
        let base_url = std::env::var(BACKEND_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(HttpBackendError::MissingEnvVar {
                var: BACKEND_URL_ENV,
            })?;

        let mut config = Self::new(base_url, request_timeout);
        if let Ok(token) = std::env::var(BACKEND_TOKEN_ENV) {
            config = config.with_token(token);
        }
        Ok(config)
    }
}
