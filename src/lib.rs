#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Outreach Core Rust
//!
//! Rust implementation of the cross-branch outreach orchestration core.
//!
//! ## Overview
//!
//! The crate coordinates a multi-branch outreach pipeline (data ingestion,
//! lead intake, messaging, delivery) without implementing any branch itself:
//! branches are external collaborators behind the
//! [`orchestration::BranchUnit`] trait, and all persistence flows through an
//! opaque [`database::DatabaseExecutor`] contract. The core never issues raw
//! SQL.
//!
//! ## Architecture
//!
//! Two orchestrators run side by side:
//!
//! - The **event router** consumes typed webhook events, authorizes each one
//!   against the process key registry (the sole gate for unmapped work),
//!   performs status-guarded transitions on the named queue tables, notifies
//!   the downstream branch, and classifies failures into a single-retry
//!   buffer or a terminal dead-letter buffer.
//! - The **execution planner** sequences whole branches in dependency order
//!   from a fixed plan catalogue, with bounded polling on dependencies and a
//!   global error blast radius on the first branch-fatal failure.
//!
//! ## Module Organization
//!
//! - [`database`] - Opaque CRUD executor contract
//! - [`registry`] - Process key reference cache and verification
//! - [`events`] - Typed webhook events
//! - [`state_machine`] - Branch lifecycle states
//! - [`orchestration`] - Event router, execution planner, queue transitions,
//!   retry/dead-letter routing
//! - [`diagnostics`] - Best-effort error sink and heartbeat emitter
//! - [`config`] - Timing and batching configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use outreach_core::config::OrchestrationConfig;
//! use outreach_core::database::DatabaseExecutor;
//! use outreach_core::orchestration::EventRouter;
//! use std::sync::Arc;
//!
//! # async fn example(executor: Arc<dyn DatabaseExecutor>) -> Result<(), Box<dyn std::error::Error>> {
//! let router = Arc::new(EventRouter::new(executor, OrchestrationConfig::default()));
//!
//! // Fatal if the process key table cannot be loaded or a queue is missing.
//! router.initialize().await?;
//! router.start_background_tasks();
//! # Ok(())
//! # }
//! ```
//!
//! ## Integration
//!
//! No network listener is provided: the embedding ingress (HTTP handler,
//! queue consumer) constructs [`events::WebhookEvent`] values and feeds them
//! to [`orchestration::EventRouter::process`].

pub mod config;
pub mod constants;
pub mod database;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod logging;
pub mod orchestration;
pub mod registry;
pub mod state_machine;

pub use config::OrchestrationConfig;
pub use database::{DatabaseExecutor, DatabaseOperation, DatabaseResult, OperationType};
pub use error::{OrchestratorError, Result};
pub use events::{WebhookEvent, WebhookEventType};
pub use orchestration::{
    BranchStatus, BranchUnit, CrossBranchMessage, CrossBranchMessageType, EventRouter,
    ExecutionPlanner, OrchestrationPlan, PlanType, ProcessingError, RegistryError, WorkflowError,
};
pub use registry::{ProcessKeyReference, ProcessKeyRegistry};
pub use state_machine::BranchState;
