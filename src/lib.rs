//! Tab Positioner — tab placement and reactivation policies driven by the
//! host's event stream.
//!
//! This library crate exposes all modules for use by the binary and
//! integration tests.

pub mod app;
pub mod constants;
pub mod events;
pub mod handlers;
pub mod host;
pub mod managers;
pub mod platform;
pub mod services;
pub mod storage;
pub mod types;
