//! Request, response and event payloads of the HTTP API.

pub mod events;
pub mod health;
pub mod session;
pub mod timer;
