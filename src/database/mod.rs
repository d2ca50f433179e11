//! # Database Executor Contract
//!
//! Opaque CRUD interface consumed by the orchestration core.
//!
//! The core never issues raw SQL: every registry load, queue transition, and
//! diagnostics write is expressed as a [`DatabaseOperation`] handed to an
//! implementation of [`DatabaseExecutor`]. The executor owns connection
//! management, dialect concerns, and backend selection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// CRUD verbs supported by the executor contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Select => write!(f, "select"),
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Upsert => write!(f, "upsert"),
        }
    }
}

/// A single operation against the backing store.
///
/// `where_clause` entries are equality predicates combined with AND; an
/// update with a `where_clause` that matches zero rows succeeds with
/// `affected_rows == 0`. `increment` expresses relative numeric updates
/// (`column = column + n`) without raw SQL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseOperation {
    pub id: String,
    pub connection: String,
    pub schema: String,
    pub table: String,
    pub operation: OperationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increment: Option<HashMap<String, i64>>,
    /// Row cap for selects; `Some(0)` is an existence probe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl DatabaseOperation {
    /// Build an operation with a generated id and empty optional parts.
    pub fn new(connection: &str, schema: &str, table: &str, operation: OperationType) -> Self {
        Self {
            id: format!("{}-{}", operation, Uuid::new_v4()),
            connection: connection.to_string(),
            schema: schema.to_string(),
            table: table.to_string(),
            operation,
            data: None,
            where_clause: None,
            increment: None,
            limit: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_where(mut self, clause: HashMap<String, Value>) -> Self {
        self.where_clause = Some(clause);
        self
    }

    pub fn with_increment(mut self, column: &str, by: i64) -> Self {
        self.increment
            .get_or_insert_with(HashMap::new)
            .insert(column.to_string(), by);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Outcome of a database operation.
///
/// `success == false` carries the backend's error message; a successful
/// update that matched nothing reports `affected_rows == Some(0)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_data: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseResult {
    pub fn ok(affected_rows: u64) -> Self {
        Self {
            success: true,
            affected_rows: Some(affected_rows),
            returned_data: None,
            error: None,
        }
    }

    pub fn ok_with_rows(rows: Vec<Value>) -> Self {
        Self {
            success: true,
            affected_rows: Some(rows.len() as u64),
            returned_data: Some(rows),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            affected_rows: None,
            returned_data: None,
            error: Some(error.into()),
        }
    }
}

/// Backend-agnostic CRUD executor consumed by every orchestration component.
#[async_trait]
pub trait DatabaseExecutor: Send + Sync {
    async fn execute(&self, operation: DatabaseOperation) -> DatabaseResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_builder_generates_unique_ids() {
        let a = DatabaseOperation::new("marketing", "shq", "heartbeat_log", OperationType::Insert);
        let b = DatabaseOperation::new("marketing", "shq", "heartbeat_log", OperationType::Insert);
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("insert-"));
    }

    #[test]
    fn test_where_clause_serializes_under_sql_name() {
        let op = DatabaseOperation::new("marketing", "outreach", "lead_queue", OperationType::Update)
            .with_data(json!({"status": "queued"}))
            .with_where(HashMap::from([("id".to_string(), json!("rec-1"))]));

        let serialized = serde_json::to_value(&op).unwrap();
        assert!(serialized.get("where").is_some());
        assert!(serialized.get("where_clause").is_none());
    }

    #[test]
    fn test_increment_accumulates_columns() {
        let op = DatabaseOperation::new("marketing", "outreach", "lead_queue", OperationType::Update)
            .with_increment("error_count", 1);
        assert_eq!(op.increment.unwrap().get("error_count"), Some(&1));
    }
}
