//! Business logic invoked by the HTTP handlers and background tasks.

/// Team session operations with role and readiness rules.
pub mod coordinator;
/// OpenAPI documentation generation.
pub mod documentation;
/// State-change notifications fanned out to subscribers.
pub mod events;
/// Health check service.
pub mod health_service;
/// Completion sinks for rewards and notifications.
pub mod observer;
/// Server-Sent Events streaming.
pub mod sse_service;
/// Periodic reconciliation against the session backend.
pub mod sync_agent;
/// Local timer controls and ticker.
pub mod timer_service;
