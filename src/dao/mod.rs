//! Session backends: the seam and its implementations.

/// Backend seam and its error type.
pub mod backend;
/// JSON-over-HTTP session backend client.
#[cfg(feature = "http-backend")]
pub mod http;
/// In-process authoritative session backend.
pub mod memory;
