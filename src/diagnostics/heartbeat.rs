use crate::constants::system;
use crate::database::{DatabaseExecutor, DatabaseOperation, OperationType};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

/// Best-effort writer of periodic liveness records to `shq.heartbeat_log`.
///
/// The emitter itself is passive; the router drives it from an interval loop
/// (default 30s) and also emits one heartbeat per successfully processed
/// event.
#[derive(Clone)]
pub struct HeartbeatEmitter {
    executor: Arc<dyn DatabaseExecutor>,
    agent_id: String,
}

impl HeartbeatEmitter {
    pub fn new(executor: Arc<dyn DatabaseExecutor>, agent_id: impl Into<String>) -> Self {
        Self {
            executor,
            agent_id: agent_id.into(),
        }
    }

    /// Emit a single heartbeat record. Failures are traced and swallowed.
    pub async fn emit(&self, heartbeat_type: &str, payload: Value) {
        let operation = DatabaseOperation::new(
            system::CONNECTION,
            system::REGISTRY_SCHEMA,
            system::HEARTBEAT_TABLE,
            OperationType::Insert,
        )
        .with_data(json!({
            "agent_id": self.agent_id,
            "heartbeat_type": heartbeat_type,
            "payload": payload.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
            "blueprint_version_hash": system::BLUEPRINT_VERSION,
        }));

        let result = self.executor.execute(operation).await;
        if !result.success {
            error!(
                heartbeat_type = %heartbeat_type,
                sink_error = result.error.as_deref().unwrap_or("unknown"),
                "❌ Failed to emit heartbeat"
            );
        }
    }
}
