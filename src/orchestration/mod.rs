//! # Orchestration Core
//!
//! Cross-branch event orchestration: an event router that validates webhook
//! events against the process key registry and moves queue records through
//! status-guarded transitions, and an execution planner that sequences whole
//! branch workflows in dependency order.
//!
//! ## Core Components
//!
//! - **EventRouter**: per-event validation, dispatch, retry/dead-letter
//!   routing, and liveness heartbeats
//! - **ExecutionPlanner**: dependency-ordered plan execution with global
//!   error blast radius and single-branch retry
//! - **QueueTransitionManager**: optimistic, status-guarded queue updates
//! - **RetryClassifier** / **RetryQueue** / **DeadLetterQueue**: transient
//!   vs. permanent failure routing
//!
//! Branch workflows themselves are external collaborators behind the
//! [`types::BranchUnit`] trait; the database is an opaque executor behind
//! [`crate::database::DatabaseExecutor`].

pub mod error_classifier;
pub mod errors;
pub mod event_router;
pub mod execution_planner;
pub mod queue_transition;
pub mod retry;
pub mod types;

pub use error_classifier::{ErrorDisposition, RetryClassifier, TRANSIENT_PHRASES};
pub use errors::{ProcessingError, RegistryError, WorkflowError};
pub use event_router::{EventRouter, RouterStatus};
pub use execution_planner::ExecutionPlanner;
pub use queue_transition::{QueueTransitionManager, TransitionContext, TransitionOutcome};
pub use retry::{DeadLetterQueue, RetryQueue};
pub use types::{
    BranchStatus, BranchUnit, CrossBranchMessage, CrossBranchMessageType, OrchestrationPlan,
    PlanType, ProjectStatus,
};
