//! # Orchestration Error Types
//!
//! Granular error enums for the registry gate, per-event processing, and
//! plan-level workflow execution. The taxonomy mirrors the propagation
//! policy: registry failures are non-retryable per event, processing errors
//! are classified into retry or dead-letter paths, and workflow errors abort
//! the whole plan.

use thiserror::Error;

/// Errors raised by the process key registry.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Full-table load failed; fatal at initialization.
    #[error("Failed to load process key reference: {reason}")]
    LoadFailed { reason: String },

    /// The event's `unique_id` has no cache entry. Non-retryable.
    #[error("UNMAPPED UNIQUE_ID: {unique_id} not found in process_key_reference. ACTION REQUIRED: insert mapping for process_id=\"{process_id}\" before proceeding")]
    UnmappedKey {
        unique_id: String,
        process_id: String,
        /// Sample of known keys for operator diagnosis.
        known_keys: Vec<String>,
    },

    /// The cached reference disagrees with the event's declared process id.
    /// Non-retryable.
    #[error("PROCESS_ID MISMATCH: {unique_id} maps to \"{expected}\" but event has \"{actual}\"")]
    ProcessIdMismatch {
        unique_id: String,
        expected: String,
        actual: String,
    },
}

impl RegistryError {
    /// Registry failures never warrant a retry: the mapping will not appear
    /// on its own.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Errors raised while processing a single webhook event.
#[derive(Debug, Clone, Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A required queue failed its startup reachability probe. Fatal at
    /// initialization, never deferred to first use.
    #[error("CRITICAL: required queue {queue} not available: {reason}")]
    QueueUnreachable { queue: String, reason: String },

    /// The downstream branch rejected its notification. Classified
    /// transient/permanent before routing.
    #[error("Branch notification failed for {branch_id}: {reason}")]
    NotificationFailed { branch_id: String, reason: String },
}

impl ProcessingError {
    /// Whether the failure bypasses classification and goes straight to
    /// dead-letter.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Self::Registry(_))
    }
}

/// Errors surfaced to callers of `execute_workflow` and
/// `retry_failed_branch`.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error("No branch unit registered for {branch_id}")]
    BranchNotRegistered { branch_id: String },

    /// The plan catalogue produced an execution order that is not a
    /// topological sort of its dependencies.
    #[error("Plan {plan_id} execution order is not a valid topological sort (branch {branch_id} runs before its dependency {dependency})")]
    InvalidExecutionOrder {
        plan_id: String,
        branch_id: String,
        dependency: String,
    },

    /// A dependency branch failed; its dependents never start.
    #[error("Dependency branch {branch_id} failed")]
    DependencyFailed { branch_id: String },

    /// The bounded dependency wait was exhausted. Fatal for the whole
    /// workflow.
    #[error("Timeout waiting for branch {branch_id} to complete after {waited_ms}ms")]
    DependencyTimeout { branch_id: String, waited_ms: u64 },

    /// A branch threw during execution; the plan is aborted.
    #[error("Branch {branch_id} failed: {reason}")]
    BranchFailed { branch_id: String, reason: String },

    /// `retry_failed_branch` was called on a branch that is not in error.
    #[error("Branch {branch_id} is not in error state (current: {current_state})")]
    BranchNotInError {
        branch_id: String,
        current_state: String,
    },
}
