//! Library crate for focus-crew: a focus timer with shared team sessions,
//! exposed for the binaries and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
