//! # Queue Transition Manager
//!
//! Optimistic, status-guarded updates on named queue tables. Each queue is a
//! `schema.table` whose `status` column acts as a per-record state machine.
//!
//! ## Guard semantics
//!
//! Every update carries `WHERE id = ? AND status = from_status`. A record
//! already moved by a concurrent pass matches zero rows; that is a silent
//! skip, not an error, because at-most-once progression is enforced by the
//! guard itself. Executor failures on one record are logged to the error
//! sink and never abort the rest of the batch.

use crate::constants::{error_types, system};
use crate::database::{DatabaseExecutor, DatabaseOperation, OperationType};
use crate::diagnostics::ErrorSink;
use crate::logging::log_queue_transition;
use crate::orchestration::errors::ProcessingError;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Routing context stamped onto every transitioned record.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub unique_id: String,
    pub process_id: String,
}

/// Fields the orchestration core writes on a queue record. Everything else
/// on the row is opaque pass-through data.
#[derive(Debug, Clone, Serialize)]
struct TransitionUpdate {
    status: String,
    updated_at: String,
    unique_id: String,
    process_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_details: Option<String>,
}

/// Per-record outcome of a batch transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The guard matched and the record moved.
    Applied { record_id: String },
    /// The record was not in `from_status`; left untouched for a later pass.
    Skipped { record_id: String },
    /// The executor failed on this record; logged, batch continued.
    Failed { record_id: String, reason: String },
}

impl TransitionOutcome {
    pub fn record_id(&self) -> &str {
        match self {
            Self::Applied { record_id }
            | Self::Skipped { record_id }
            | Self::Failed { record_id, .. } => record_id,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Performs status-guarded record moves between queue states.
#[derive(Clone)]
pub struct QueueTransitionManager {
    executor: Arc<dyn DatabaseExecutor>,
    error_sink: ErrorSink,
}

impl QueueTransitionManager {
    pub fn new(executor: Arc<dyn DatabaseExecutor>, error_sink: ErrorSink) -> Self {
        Self {
            executor,
            error_sink,
        }
    }

    /// Probe a queue for reachability without moving data.
    ///
    /// Used at router startup; any unreachable required queue is fatal at
    /// initialization.
    pub async fn probe_queue(&self, queue_name: &str) -> Result<(), ProcessingError> {
        let (schema, table) = split_queue_name(queue_name)?;
        let operation = DatabaseOperation::new(system::CONNECTION, schema, table, OperationType::Select)
            .with_limit(0);

        let result = self.executor.execute(operation).await;
        if result.success {
            Ok(())
        } else {
            Err(ProcessingError::QueueUnreachable {
                queue: queue_name.to_string(),
                reason: result
                    .error
                    .unwrap_or_else(|| "no error detail from executor".to_string()),
            })
        }
    }

    /// Move each record independently from `from_status` to `to_status`.
    ///
    /// Supplying `error_details` also increments the record's `error_count`.
    /// The returned outcomes are positionally aligned with `record_ids`.
    pub async fn transition(
        &self,
        queue_name: &str,
        record_ids: &[String],
        from_status: &str,
        to_status: &str,
        context: &TransitionContext,
        error_details: Option<&str>,
    ) -> Result<Vec<TransitionOutcome>, ProcessingError> {
        let (schema, table) = split_queue_name(queue_name)?;
        let mut outcomes = Vec::with_capacity(record_ids.len());

        for record_id in record_ids {
            let update = TransitionUpdate {
                status: to_status.to_string(),
                updated_at: Utc::now().to_rfc3339(),
                unique_id: context.unique_id.clone(),
                process_id: context.process_id.clone(),
                error_details: error_details.map(str::to_string),
            };

            let mut operation =
                DatabaseOperation::new(system::CONNECTION, schema, table, OperationType::Update)
                    .with_data(serde_json::to_value(&update).unwrap_or_default())
                    .with_where(HashMap::from([
                        ("id".to_string(), json!(record_id)),
                        ("status".to_string(), json!(from_status)),
                    ]));
            if error_details.is_some() {
                operation = operation.with_increment("error_count", 1);
            }

            let result = self.executor.execute(operation).await;
            let outcome = if !result.success {
                let reason = result
                    .error
                    .unwrap_or_else(|| "no error detail from executor".to_string());
                self.error_sink
                    .record(
                        error_types::QUEUE_TRANSITION_FAILED,
                        &format!(
                            "Failed to transition {queue_name}[{record_id}] from {from_status} to {to_status}"
                        ),
                        json!({
                            "queue": queue_name,
                            "record_id": record_id,
                            "from_status": from_status,
                            "to_status": to_status,
                            "error": reason,
                        }),
                        Some(&context.unique_id),
                        Some(&context.process_id),
                    )
                    .await;
                TransitionOutcome::Failed {
                    record_id: record_id.clone(),
                    reason,
                }
            } else if result.affected_rows.unwrap_or(0) == 0 {
                TransitionOutcome::Skipped {
                    record_id: record_id.clone(),
                }
            } else {
                TransitionOutcome::Applied {
                    record_id: record_id.clone(),
                }
            };

            log_queue_transition(
                queue_name,
                record_id,
                from_status,
                to_status,
                match &outcome {
                    TransitionOutcome::Applied { .. } => "applied",
                    TransitionOutcome::Skipped { .. } => "skipped",
                    TransitionOutcome::Failed { .. } => "failed",
                },
            );
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

fn split_queue_name(queue_name: &str) -> Result<(&str, &str), ProcessingError> {
    queue_name
        .split_once('.')
        .filter(|(schema, table)| !schema.is_empty() && !table.is_empty())
        .ok_or_else(|| ProcessingError::QueueUnreachable {
            queue: queue_name.to_string(),
            reason: "queue name must be schema.table".to_string(),
        })
}
