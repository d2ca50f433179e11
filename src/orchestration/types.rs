//! # Orchestration Types
//!
//! Shared types for cross-branch coordination: branch status records, the
//! plan catalogue, cross-branch messages, and the `BranchUnit` contract that
//! branch workflows implement.

use crate::constants::branches;
use crate::state_machine::BranchState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Live status of one registered branch. Mutated only by the execution
/// planner; never deleted, reset to `Idle`/0 on retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchStatus {
    pub branch_id: String,
    pub orchestrator_id: String,
    pub status: BranchState,
    pub progress_percentage: u8,
    pub error_count: u32,
    pub last_activity: DateTime<Utc>,
}

impl BranchStatus {
    pub fn idle(branch_id: &str, orchestrator_id: &str) -> Self {
        Self {
            branch_id: branch_id.to_string(),
            orchestrator_id: orchestrator_id.to_string(),
            status: BranchState::default(),
            progress_percentage: 0,
            error_count: 0,
            last_activity: Utc::now(),
        }
    }
}

/// Fixed catalogue of workflow shapes the planner can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    /// Ingestion through delivery, linear dependencies.
    FullPipeline,
    /// Ingestion and lead intake only.
    LeadOnly,
    /// Messaging in isolation.
    MessagingOnly,
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullPipeline => write!(f, "full_pipeline"),
            Self::LeadOnly => write!(f, "lead_only"),
            Self::MessagingOnly => write!(f, "messaging_only"),
        }
    }
}

impl std::str::FromStr for PlanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_pipeline" => Ok(Self::FullPipeline),
            "lead_only" => Ok(Self::LeadOnly),
            "messaging_only" => Ok(Self::MessagingOnly),
            _ => Err(format!("Unknown plan type: {s}")),
        }
    }
}

/// A dependency-ordered plan over named branches. Immutable after creation;
/// `execution_order` must be a topological sort of `dependencies`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationPlan {
    pub id: String,
    pub plan_type: PlanType,
    pub active_branches: Vec<String>,
    pub dependencies: HashMap<String, Vec<String>>,
    pub execution_order: Vec<String>,
    pub estimated_duration: Duration,
}

impl OrchestrationPlan {
    /// Build the hard-coded plan for a catalogue entry.
    pub fn for_plan_type(plan_type: PlanType) -> Self {
        let (active_branches, dependencies, execution_order, estimated_duration) = match plan_type {
            PlanType::FullPipeline => (
                vec![
                    branches::DATA_INGESTION.to_string(),
                    branches::LEAD_INTAKE.to_string(),
                    branches::MESSAGING.to_string(),
                    branches::DELIVERY.to_string(),
                ],
                HashMap::from([
                    (
                        branches::LEAD_INTAKE.to_string(),
                        vec![branches::DATA_INGESTION.to_string()],
                    ),
                    (
                        branches::MESSAGING.to_string(),
                        vec![branches::LEAD_INTAKE.to_string()],
                    ),
                    (
                        branches::DELIVERY.to_string(),
                        vec![branches::MESSAGING.to_string()],
                    ),
                ]),
                vec![
                    branches::DATA_INGESTION.to_string(),
                    branches::LEAD_INTAKE.to_string(),
                    branches::MESSAGING.to_string(),
                    branches::DELIVERY.to_string(),
                ],
                Duration::from_secs(300),
            ),
            PlanType::LeadOnly => (
                vec![
                    branches::DATA_INGESTION.to_string(),
                    branches::LEAD_INTAKE.to_string(),
                ],
                HashMap::from([(
                    branches::LEAD_INTAKE.to_string(),
                    vec![branches::DATA_INGESTION.to_string()],
                )]),
                vec![
                    branches::DATA_INGESTION.to_string(),
                    branches::LEAD_INTAKE.to_string(),
                ],
                Duration::from_secs(120),
            ),
            PlanType::MessagingOnly => (
                vec![branches::MESSAGING.to_string()],
                HashMap::new(),
                vec![branches::MESSAGING.to_string()],
                Duration::from_secs(60),
            ),
        };

        Self {
            id: format!("plan-{}", Uuid::new_v4()),
            plan_type,
            active_branches,
            dependencies,
            execution_order,
            estimated_duration,
        }
    }

    /// Declared dependencies of a branch, empty when it has none.
    pub fn dependencies_of(&self, branch_id: &str) -> &[String] {
        self.dependencies
            .get(branch_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Message categories exchanged between branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossBranchMessageType {
    DataReady,
    Error,
    RequestStatus,
    PriorityChange,
}

impl fmt::Display for CrossBranchMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataReady => write!(f, "data_ready"),
            Self::Error => write!(f, "error"),
            Self::RequestStatus => write!(f, "request_status"),
            Self::PriorityChange => write!(f, "priority_change"),
        }
    }
}

/// Advisory message between branches: appended to the planner's message log
/// and delivered directly to the target branch unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossBranchMessage {
    pub id: String,
    pub from_branch: String,
    pub to_branch: String,
    pub message_type: CrossBranchMessageType,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub requires_response: bool,
}

impl CrossBranchMessage {
    pub fn new(
        from_branch: impl Into<String>,
        to_branch: impl Into<String>,
        message_type: CrossBranchMessageType,
        payload: Value,
    ) -> Self {
        Self {
            id: format!("msg-{}", Uuid::new_v4()),
            from_branch: from_branch.into(),
            to_branch: to_branch.into(),
            message_type,
            payload,
            timestamp: Utc::now(),
            requires_response: false,
        }
    }
}

/// Contract implemented by branch workflow units (lead intake, messaging,
/// delivery). Consumed by the planner and router; messages are advisory and
/// a branch may ignore them.
#[async_trait]
pub trait BranchUnit: Send + Sync {
    /// Stable branch identifier (e.g. `01-lead-intake`).
    fn id(&self) -> String;

    /// Run the branch's workflow to completion.
    async fn execute(&self) -> anyhow::Result<()>;

    /// Receive an advisory cross-branch message.
    async fn receive_message(&self, message: CrossBranchMessage) -> anyhow::Result<()>;

    /// Branch-reported state, for diagnostics only; authoritative status
    /// lives with the planner.
    fn status(&self) -> BranchState;
}

/// Aggregated view over all registered branches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub overall_status: BranchState,
    pub overall_progress: u8,
    pub branches: Vec<BranchStatus>,
}
