//! # Diagnostics Sinks
//!
//! Best-effort persistent observability: structured error records and
//! periodic liveness heartbeats, both written through the database executor.
//! A failed sink write is traced and swallowed, never propagated.

pub mod error_sink;
pub mod heartbeat;

pub use error_sink::ErrorSink;
pub use heartbeat::HeartbeatEmitter;
