// Tab Positioner shared type definitions
// Each submodule defines types used across the engine.

pub mod errors;
pub mod events;
pub mod settings;
pub mod tab;

use std::future::Future;
use std::pin::Pin;

/// Boxed future type used by the async traits at the storage and host
/// boundaries, keeping them object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
