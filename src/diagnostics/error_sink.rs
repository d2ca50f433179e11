use crate::constants::system;
use crate::database::{DatabaseExecutor, DatabaseOperation, OperationType};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

/// Best-effort writer of structured error records to
/// `shq.master_error_log`.
///
/// Sink failures are only traced: losing a diagnostic record must never take
/// down the path that produced it.
#[derive(Clone)]
pub struct ErrorSink {
    executor: Arc<dyn DatabaseExecutor>,
    agent_id: String,
}

impl ErrorSink {
    pub fn new(executor: Arc<dyn DatabaseExecutor>, agent_id: impl Into<String>) -> Self {
        Self {
            executor,
            agent_id: agent_id.into(),
        }
    }

    /// Record an error with full triggering context.
    pub async fn record(
        &self,
        error_type: &str,
        error_message: &str,
        details: Value,
        unique_id: Option<&str>,
        process_id: Option<&str>,
    ) {
        let operation = DatabaseOperation::new(
            system::CONNECTION,
            system::REGISTRY_SCHEMA,
            system::ERROR_LOG_TABLE,
            OperationType::Insert,
        )
        .with_data(json!({
            "agent_id": self.agent_id,
            "error_type": error_type,
            "error_message": error_message,
            "error_details": details.to_string(),
            "unique_id": unique_id,
            "process_id": process_id,
            "created_at": Utc::now().to_rfc3339(),
        }));

        let result = self.executor.execute(operation).await;
        if !result.success {
            error!(
                error_type = %error_type,
                sink_error = result.error.as_deref().unwrap_or("unknown"),
                "❌ Failed to write to master_error_log"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseResult;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingExecutor {
        operations: Mutex<Vec<DatabaseOperation>>,
        fail: bool,
    }

    #[async_trait]
    impl DatabaseExecutor for RecordingExecutor {
        async fn execute(&self, operation: DatabaseOperation) -> DatabaseResult {
            self.operations.lock().push(operation);
            if self.fail {
                DatabaseResult::failed("disk full")
            } else {
                DatabaseResult::ok(1)
            }
        }
    }

    #[tokio::test]
    async fn test_record_inserts_full_context() {
        let executor = Arc::new(RecordingExecutor::default());
        let sink = ErrorSink::new(executor.clone(), "overall-orchestrator");

        sink.record(
            "process_key_unmapped",
            "UNMAPPED UNIQUE_ID: uid-9",
            json!({"available_keys": ["uid-1"]}),
            Some("uid-9"),
            Some("proc-1"),
        )
        .await;

        let ops = executor.operations.lock();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].table, "master_error_log");
        let data = ops[0].data.as_ref().unwrap();
        assert_eq!(data["agent_id"], "overall-orchestrator");
        assert_eq!(data["unique_id"], "uid-9");
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let executor = Arc::new(RecordingExecutor {
            fail: true,
            ..Default::default()
        });
        let sink = ErrorSink::new(executor, "overall-orchestrator");
        // Must not panic or propagate.
        sink.record("webhook_processing_failed", "boom", json!({}), None, None)
            .await;
    }
}
