//! # Process Key Registry
//!
//! Cached, authoritative mapping from `unique_id` step identifiers to process
//! metadata, loaded wholesale from `shq.process_key_reference`.
//!
//! ## Guarantees
//!
//! - `load` replaces the cache atomically: readers see either the previous
//!   complete snapshot or the new one, never a partially filled map.
//! - `verify` is the sole authorization gate for event processing; failures
//!   are non-retryable and callers must route the event to dead-letter.
//! - A failed `load` at startup is fatal: the router must not accept events
//!   without this table.

use crate::constants::system;
use crate::database::{DatabaseExecutor, DatabaseOperation, OperationType};
use crate::logging::log_registry_operation;
use crate::orchestration::errors::RegistryError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One row of the process key reference table. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessKeyReference {
    pub unique_id: String,
    pub process_id: String,
    pub blueprint_version_hash: String,
    pub human_description: String,
    pub branch_id: String,
    pub step_name: String,
    pub created_at: DateTime<Utc>,
}

/// In-memory cache over the process key reference table.
pub struct ProcessKeyRegistry {
    executor: Arc<dyn DatabaseExecutor>,
    cache: RwLock<Arc<HashMap<String, ProcessKeyReference>>>,
    /// How many known keys to surface in unmapped-key diagnostics.
    diagnostic_keys: usize,
}

impl ProcessKeyRegistry {
    pub fn new(executor: Arc<dyn DatabaseExecutor>, diagnostic_keys: usize) -> Self {
        Self {
            executor,
            cache: RwLock::new(Arc::new(HashMap::new())),
            diagnostic_keys,
        }
    }

    /// Load the full reference table and swap it into the cache.
    ///
    /// The previous snapshot stays valid until the replacement map is fully
    /// built; rows that fail to deserialize abort the load rather than
    /// producing a partial cache.
    pub async fn load(&self) -> Result<usize, RegistryError> {
        let operation = DatabaseOperation::new(
            system::CONNECTION,
            system::REGISTRY_SCHEMA,
            system::PROCESS_KEY_TABLE,
            OperationType::Select,
        );

        let result = self.executor.execute(operation).await;
        if !result.success {
            let reason = result
                .error
                .unwrap_or_else(|| "no error detail from executor".to_string());
            log_registry_operation("load", None, None, "failed", Some(&reason));
            return Err(RegistryError::LoadFailed { reason });
        }

        let rows = result.returned_data.unwrap_or_default();
        let mut replacement = HashMap::with_capacity(rows.len());
        for row in rows {
            let reference: ProcessKeyReference =
                serde_json::from_value(row).map_err(|e| RegistryError::LoadFailed {
                    reason: format!("malformed process key reference row: {e}"),
                })?;
            replacement.insert(reference.unique_id.clone(), reference);
        }

        let loaded = replacement.len();
        *self.cache.write() = Arc::new(replacement);

        info!(
            process_keys = loaded,
            "📚 Loaded process key reference cache"
        );
        Ok(loaded)
    }

    /// On-demand refresh with identical semantics to the initial `load`.
    pub async fn refresh(&self) -> Result<usize, RegistryError> {
        debug!("Refreshing process key reference cache");
        self.load().await
    }

    /// Resolve and authorize a step identifier.
    ///
    /// Fails with `UnmappedKey` when the id has no cache entry and with
    /// `ProcessIdMismatch` when the cached `process_id` differs from the
    /// declared one. Both are non-retryable.
    pub fn verify(
        &self,
        unique_id: &str,
        process_id: &str,
    ) -> Result<ProcessKeyReference, RegistryError> {
        let cache = Arc::clone(&self.cache.read());

        let Some(reference) = cache.get(unique_id) else {
            let known: Vec<String> = cache.keys().take(self.diagnostic_keys).cloned().collect();
            warn!(
                unique_id = %unique_id,
                process_id = %process_id,
                known_keys = ?known,
                "❌ UNMAPPED UNIQUE_ID: insert a process key mapping before proceeding"
            );
            return Err(RegistryError::UnmappedKey {
                unique_id: unique_id.to_string(),
                process_id: process_id.to_string(),
                known_keys: known,
            });
        };

        if reference.process_id != process_id {
            warn!(
                unique_id = %unique_id,
                expected = %reference.process_id,
                actual = %process_id,
                "❌ PROCESS_ID MISMATCH"
            );
            return Err(RegistryError::ProcessIdMismatch {
                unique_id: unique_id.to_string(),
                expected: reference.process_id.clone(),
                actual: process_id.to_string(),
            });
        }

        debug!(
            unique_id = %unique_id,
            description = %reference.human_description,
            "✅ Process key verified"
        );
        Ok(reference.clone())
    }

    /// Number of cached references.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Snapshot of all known step identifiers, for operator diagnostics.
    pub fn known_keys(&self) -> Vec<String> {
        self.cache.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseResult;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedExecutor {
        result: DatabaseResult,
    }

    #[async_trait]
    impl DatabaseExecutor for FixedExecutor {
        async fn execute(&self, _operation: DatabaseOperation) -> DatabaseResult {
            self.result.clone()
        }
    }

    struct SwitchableExecutor {
        result: parking_lot::Mutex<DatabaseResult>,
    }

    impl SwitchableExecutor {
        fn new(result: DatabaseResult) -> Arc<Self> {
            Arc::new(Self {
                result: parking_lot::Mutex::new(result),
            })
        }

        fn set_result(&self, result: DatabaseResult) {
            *self.result.lock() = result;
        }
    }

    #[async_trait]
    impl DatabaseExecutor for SwitchableExecutor {
        async fn execute(&self, _operation: DatabaseOperation) -> DatabaseResult {
            self.result.lock().clone()
        }
    }

    fn reference_row(unique_id: &str, process_id: &str) -> serde_json::Value {
        json!({
            "unique_id": unique_id,
            "process_id": process_id,
            "blueprint_version_hash": "v1.0.0",
            "human_description": format!("step {unique_id}"),
            "branch_id": "01-lead-intake",
            "step_name": "canonicalize",
            "created_at": "2025-01-15T12:00:00Z",
        })
    }

    fn registry_with_rows(rows: Vec<serde_json::Value>) -> ProcessKeyRegistry {
        let executor = Arc::new(FixedExecutor {
            result: DatabaseResult::ok_with_rows(rows),
        });
        ProcessKeyRegistry::new(executor, 10)
    }

    #[tokio::test]
    async fn test_load_caches_all_rows() {
        let registry = registry_with_rows(vec![
            reference_row("uid-1", "proc-1"),
            reference_row("uid-2", "proc-2"),
        ]);
        assert_eq!(registry.load().await.unwrap(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_load_failure_is_fatal() {
        let executor = Arc::new(FixedExecutor {
            result: DatabaseResult::failed("connection refused"),
        });
        let registry = ProcessKeyRegistry::new(executor, 10);
        let err = registry.load().await.unwrap_err();
        assert!(matches!(err, RegistryError::LoadFailed { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_row_aborts_load_without_partial_cache() {
        let registry = registry_with_rows(vec![
            reference_row("uid-1", "proc-1"),
            json!({"unique_id": "uid-2"}),
        ]);
        assert!(registry.load().await.is_err());
        // The failed load must not leave a half-built snapshot behind.
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let executor = SwitchableExecutor::new(DatabaseResult::ok_with_rows(vec![
            reference_row("uid-1", "proc-1"),
            reference_row("uid-2", "proc-2"),
        ]));
        let registry = ProcessKeyRegistry::new(executor.clone(), 10);
        registry.load().await.unwrap();
        assert_eq!(registry.len(), 2);

        // Executor failure: the populated snapshot must stay authoritative.
        executor.set_result(DatabaseResult::failed("connection refused"));
        assert!(registry.refresh().await.is_err());
        assert_eq!(registry.len(), 2);
        assert!(registry.verify("uid-1", "proc-1").is_ok());

        // Malformed replacement row: same guarantee, no partial swap.
        executor.set_result(DatabaseResult::ok_with_rows(vec![
            reference_row("uid-3", "proc-3"),
            json!({"unique_id": "uid-4"}),
        ]));
        assert!(registry.refresh().await.is_err());
        assert_eq!(registry.len(), 2);
        assert!(registry.verify("uid-2", "proc-2").is_ok());
        assert!(registry.verify("uid-3", "proc-3").is_err());
    }

    #[tokio::test]
    async fn test_verify_unmapped_key_lists_known_keys() {
        let registry = registry_with_rows(vec![reference_row("uid-1", "proc-1")]);
        registry.load().await.unwrap();

        match registry.verify("uid-missing", "proc-1") {
            Err(RegistryError::UnmappedKey { known_keys, .. }) => {
                assert_eq!(known_keys, vec!["uid-1".to_string()]);
            }
            other => panic!("expected UnmappedKey, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_process_id_mismatch() {
        let registry = registry_with_rows(vec![reference_row("uid-1", "proc-1")]);
        registry.load().await.unwrap();

        let err = registry.verify("uid-1", "proc-other").unwrap_err();
        assert!(matches!(err, RegistryError::ProcessIdMismatch { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_verify_success_returns_reference() {
        let registry = registry_with_rows(vec![reference_row("uid-1", "proc-1")]);
        registry.load().await.unwrap();

        let reference = registry.verify("uid-1", "proc-1").unwrap();
        assert_eq!(reference.branch_id, "01-lead-intake");
    }
}
