//! Error types raised by the HTTP session backend client.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::backend::BackendError;

/// Convenient result alias returning [`HttpBackendError`] failures.
pub type HttpResult<T> = Result<T, HttpBackendError>;

/// Failures that can occur while talking to the session backend over HTTP.
#[derive(Debug, Error)]
pub enum HttpBackendError {
    /// Required environment variable is missing.
    #[error("missing session backend environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The configured base URL cannot be used to build request paths.
    #[error("invalid session backend url `{url}`")]
    InvalidBaseUrl {
        /// Rejected URL.
        url: String,
    },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build session backend client")]
    ClientBuilder {
        /// Builder failure.
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent or timed out in flight.
    #[error("failed to send request to `{path}`")]
    RequestSend {
        /// Request path.
        path: String,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a status code we do not handle.
    #[error("unexpected response status {status} for `{path}`")]
    RequestStatus {
        /// Request path.
        path: String,
        /// Status returned by the backend.
        status: StatusCode,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode response for `{path}`")]
    DecodeResponse {
        /// Request path.
        path: String,
        /// Decoding failure.
        #[source]
        source: reqwest::Error,
    },
}

impl From<HttpBackendError> for BackendError {
    fn from(err: HttpBackendError) -> Self {
        let rejected = matches!(
            &err,
            HttpBackendError::RequestStatus { status, .. } if status.is_client_error()
        );
        if rejected {
            BackendError::Rejected(err.to_string())
        } else {
            BackendError::unavailable("http session backend".into(), err)
        }
    }
}
