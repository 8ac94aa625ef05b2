//! watchlog: local watch, search and playback-progress history for media clients.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod clock;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
