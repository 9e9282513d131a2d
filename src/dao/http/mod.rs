mod client;
mod config;
mod error;

pub use client::HttpSessionBackend;
pub use config::HttpBackendConfig;
pub use error::{HttpBackendError, HttpResult};
