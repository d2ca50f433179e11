//! # Event Types
//!
//! Typed webhook events consumed by the event router. Events originate at an
//! external ingress (HTTP handler, queue consumer) and are consumed exactly
//! once, or re-enqueued for a single retry with a refreshed timestamp.

pub mod webhook;

pub use webhook::{WebhookEvent, WebhookEventType};
