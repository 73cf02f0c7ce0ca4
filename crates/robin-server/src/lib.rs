//! # robin-server - Process Supervisor and Control Plane
//!
//! The control-plane half of Road Robin: launches the detection worker
//! as a managed subprocess, tracks its lifetime (descendants included),
//! and exposes start/stop/health over HTTP with asynchronous status
//! broadcast to WebSocket subscribers.
//!
//! Depends on [`robin_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Process Management
//! - [`Supervisor`] - Single-instance worker lifecycle state machine
//! - [`ProcessBackend`] / [`LocalProcessBackend`] - {spawn, descendants,
//!   terminate} capability, implemented by [`OsBackend`]
//! - [`SpawnedWorker`] - Launched pid plus its exit channel
//!
//! ### Status Broadcast
//! - [`StatusBroadcaster`] - Fan-out with per-subscriber queues and
//!   current-status catch-up
//!
//! ### HTTP / WebSocket Surface
//! - [`router()`] / [`serve()`] - `/health`, `/start`, `/stop`, the
//!   worker-inbound notification routes, and the `/ws` status stream
//! - [`AppState`] - Shared route state

pub mod backend;
pub mod broadcast;
pub mod http;
pub mod supervisor;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod websocket;

pub use backend::{LocalProcessBackend, OsBackend, ProcessBackend, SpawnedWorker};
pub use broadcast::{Published, StatusBroadcaster, Subscription};
pub use http::{router, serve, ApiResponse, AppState, StartRequest};
pub use supervisor::Supervisor;
