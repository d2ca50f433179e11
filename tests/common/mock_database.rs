//! In-memory database executor for integration tests.
//!
//! Implements the executor contract over simple JSON row tables: equality
//! WHERE clauses, merge-style updates, and relative `increment` columns.
//! Failures can be injected per table to exercise error paths.

use async_trait::async_trait;
use outreach_core::database::{
    DatabaseExecutor, DatabaseOperation, DatabaseResult, OperationType,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Default)]
pub struct MockDatabase {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failures: Mutex<HashMap<String, String>>,
    operations: Mutex<Vec<DatabaseOperation>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn table_key(schema: &str, table: &str) -> String {
        format!("{schema}.{table}")
    }

    /// Create an empty table so existence probes succeed.
    pub fn create_table(&self, qualified_name: &str) {
        self.tables
            .lock()
            .entry(qualified_name.to_string())
            .or_default();
    }

    /// Create every table the router requires at startup.
    pub fn with_standard_tables(self) -> Self {
        for table in [
            "shq.process_key_reference",
            "shq.master_error_log",
            "shq.heartbeat_log",
            "outreach.lead_queue",
            "messaging.compose_queue",
            "messaging.approval_queue",
            "delivery.send_queue",
            "delivery.reply_queue",
        ] {
            self.create_table(table);
        }
        self
    }

    pub fn insert_row(&self, qualified_name: &str, row: Value) {
        self.tables
            .lock()
            .entry(qualified_name.to_string())
            .or_default()
            .push(row);
    }

    pub fn seed_queue_record(&self, qualified_name: &str, record_id: &str, status: &str) {
        self.insert_row(
            qualified_name,
            json!({"id": record_id, "status": status, "error_count": 0}),
        );
    }

    pub fn seed_process_key(&self, unique_id: &str, process_id: &str, branch_id: &str) {
        self.insert_row(
            "shq.process_key_reference",
            json!({
                "unique_id": unique_id,
                "process_id": process_id,
                "blueprint_version_hash": "v1.0.0",
                "human_description": format!("step {unique_id}"),
                "branch_id": branch_id,
                "step_name": "test-step",
                "created_at": "2025-01-15T12:00:00Z",
            }),
        );
    }

    /// Every subsequent operation against the table fails with `message`.
    pub fn inject_failure(&self, qualified_name: &str, message: &str) {
        self.failures
            .lock()
            .insert(qualified_name.to_string(), message.to_string());
    }

    pub fn clear_failure(&self, qualified_name: &str) {
        self.failures.lock().remove(qualified_name);
    }

    /// Current status of a queue record, if present.
    pub fn status_of(&self, qualified_name: &str, record_id: &str) -> Option<String> {
        self.field_of(qualified_name, record_id, "status")
            .and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn field_of(&self, qualified_name: &str, record_id: &str, field: &str) -> Option<Value> {
        self.tables.lock().get(qualified_name).and_then(|rows| {
            rows.iter()
                .find(|row| row.get("id").and_then(Value::as_str) == Some(record_id))
                .and_then(|row| row.get(field).cloned())
        })
    }

    pub fn rows_of(&self, qualified_name: &str) -> Vec<Value> {
        self.tables
            .lock()
            .get(qualified_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of rows inserted into a table (e.g. heartbeat or error log).
    pub fn row_count(&self, qualified_name: &str) -> usize {
        self.rows_of(qualified_name).len()
    }

    pub fn operation_log(&self) -> Vec<DatabaseOperation> {
        self.operations.lock().clone()
    }

    fn matches(row: &Value, where_clause: &HashMap<String, Value>) -> bool {
        where_clause
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected))
    }
}

#[async_trait]
impl DatabaseExecutor for MockDatabase {
    async fn execute(&self, operation: DatabaseOperation) -> DatabaseResult {
        self.operations.lock().push(operation.clone());
        let key = Self::table_key(&operation.schema, &operation.table);

        if let Some(message) = self.failures.lock().get(&key) {
            return DatabaseResult::failed(message.clone());
        }

        let mut tables = self.tables.lock();
        match operation.operation {
            OperationType::Select => {
                let Some(rows) = tables.get(&key) else {
                    return DatabaseResult::failed(format!("relation {key} does not exist"));
                };
                let mut selected: Vec<Value> = match &operation.where_clause {
                    Some(clause) => rows
                        .iter()
                        .filter(|row| Self::matches(row, clause))
                        .cloned()
                        .collect(),
                    None => rows.clone(),
                };
                if let Some(limit) = operation.limit {
                    selected.truncate(limit);
                }
                DatabaseResult::ok_with_rows(selected)
            }
            OperationType::Insert | OperationType::Upsert => {
                let Some(data) = operation.data else {
                    return DatabaseResult::failed("insert requires data");
                };
                tables.entry(key).or_default().push(data);
                DatabaseResult::ok(1)
            }
            OperationType::Update => {
                let Some(rows) = tables.get_mut(&key) else {
                    return DatabaseResult::failed(format!("relation {key} does not exist"));
                };
                let clause = operation.where_clause.unwrap_or_default();
                let updates = operation
                    .data
                    .as_ref()
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                let mut affected = 0u64;
                for row in rows.iter_mut().filter(|row| Self::matches(row, &clause)) {
                    if let Some(object) = row.as_object_mut() {
                        for (column, value) in &updates {
                            object.insert(column.clone(), value.clone());
                        }
                        if let Some(increments) = &operation.increment {
                            for (column, by) in increments {
                                let current =
                                    object.get(column).and_then(Value::as_i64).unwrap_or(0);
                                object.insert(column.clone(), json!(current + by));
                            }
                        }
                        affected += 1;
                    }
                }
                DatabaseResult::ok(affected)
            }
            OperationType::Delete => {
                let Some(rows) = tables.get_mut(&key) else {
                    return DatabaseResult::failed(format!("relation {key} does not exist"));
                };
                let clause = operation.where_clause.unwrap_or_default();
                let before = rows.len();
                rows.retain(|row| !Self::matches(row, &clause));
                DatabaseResult::ok((before - rows.len()) as u64)
            }
        }
    }
}
