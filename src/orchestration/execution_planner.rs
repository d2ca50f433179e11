//! # Execution Planner
//!
//! Master orchestrator: builds a dependency-ordered plan over named branches
//! from a fixed catalogue, executes each branch sequentially once its
//! dependencies report completion, and propagates fatal errors to every
//! branch (global blast radius, no partial-success continuation).
//!
//! Branch state transitions are driven only by this planner, never by the
//! branch units themselves.

use crate::config::OrchestrationConfig;
use crate::constants::{branches, system};
use crate::orchestration::errors::WorkflowError;
use crate::orchestration::types::{
    BranchStatus, BranchUnit, CrossBranchMessage, CrossBranchMessageType, OrchestrationPlan,
    PlanType, ProjectStatus,
};
use crate::state_machine::BranchState;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Sequences whole branch workflows in dependency order.
pub struct ExecutionPlanner {
    config: OrchestrationConfig,
    branch_units: RwLock<HashMap<String, Arc<dyn BranchUnit>>>,
    branch_statuses: RwLock<HashMap<String, BranchStatus>>,
    message_log: Mutex<Vec<CrossBranchMessage>>,
}

impl ExecutionPlanner {
    pub fn new(config: OrchestrationConfig) -> Self {
        // Every known branch gets a status entry up front; entries are never
        // deleted, only reset.
        let statuses = branches::ALL
            .iter()
            .map(|branch_id| {
                (
                    branch_id.to_string(),
                    BranchStatus::idle(branch_id, &format!("{branch_id}-orchestrator")),
                )
            })
            .collect();

        info!(
            agent_id = system::PLANNER_AGENT_ID,
            known_branches = branches::ALL.len(),
            "🎯 Execution planner ready"
        );
        Self {
            config,
            branch_units: RwLock::new(HashMap::new()),
            branch_statuses: RwLock::new(statuses),
            message_log: Mutex::new(Vec::new()),
        }
    }

    /// Register a branch unit for execution and message delivery.
    pub fn register_branch(&self, unit: Arc<dyn BranchUnit>) {
        let branch_id = unit.id();
        self.branch_statuses
            .write()
            .entry(branch_id.clone())
            .or_insert_with(|| {
                BranchStatus::idle(&branch_id, &format!("{branch_id}-orchestrator"))
            });
        info!(branch_id = %branch_id, "✅ Registered branch orchestrator");
        self.branch_units.write().insert(branch_id, unit);
    }

    /// Execute a catalogue workflow to completion.
    ///
    /// The first branch failure aborts the plan: dependents never run, every
    /// branch still processing is marked `error`, and an error advisory is
    /// broadcast to all other registered branches.
    pub async fn execute_workflow(&self, plan_type: PlanType) -> Result<(), WorkflowError> {
        let plan = OrchestrationPlan::for_plan_type(plan_type);
        validate_execution_order(&plan)?;
        self.require_registered(&plan)?;

        info!(
            plan_id = %plan.id,
            plan_type = %plan_type,
            branches = ?plan.active_branches,
            "🚀 Executing orchestration plan"
        );

        for (position, branch_id) in plan.execution_order.iter().enumerate() {
            if let Err(workflow_error) = self.execute_branch(branch_id, &plan).await {
                let never_started = &plan.execution_order[position + 1..];
                self.handle_global_error(branch_id, never_started, &workflow_error)
                    .await;
                return Err(workflow_error);
            }
        }

        info!(plan_id = %plan.id, "✅ Workflow completed successfully");
        Ok(())
    }

    async fn execute_branch(
        &self,
        branch_id: &str,
        plan: &OrchestrationPlan,
    ) -> Result<(), WorkflowError> {
        for dependency in plan.dependencies_of(branch_id) {
            self.wait_for_completion(dependency).await?;
        }

        let unit = self.branch_units.read().get(branch_id).cloned().ok_or_else(|| {
            WorkflowError::BranchNotRegistered {
                branch_id: branch_id.to_string(),
            }
        })?;

        self.update_branch_status(branch_id, BranchState::Processing, None);
        info!(branch_id = %branch_id, "⚡ Starting branch");

        match unit.execute().await {
            Ok(()) => {
                self.update_branch_status(branch_id, BranchState::Completed, Some(100));
                info!(branch_id = %branch_id, "✅ Completed branch");
                Ok(())
            }
            Err(e) => {
                self.update_branch_status(branch_id, BranchState::Error, None);
                Err(WorkflowError::BranchFailed {
                    branch_id: branch_id.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Bounded polling wait for a dependency branch.
    ///
    /// Fixed poll interval, fixed budget; exhausting the budget fails the
    /// whole workflow.
    async fn wait_for_completion(&self, branch_id: &str) -> Result<(), WorkflowError> {
        let poll_interval = Duration::from_millis(self.config.dependency_poll_interval_ms);
        let budget = Duration::from_millis(self.config.dependency_max_wait_ms);
        let started = Instant::now();

        loop {
            match self.branch_state(branch_id) {
                Some(state) if state.satisfies_dependencies() => return Ok(()),
                Some(BranchState::Error) => {
                    return Err(WorkflowError::DependencyFailed {
                        branch_id: branch_id.to_string(),
                    })
                }
                _ => {}
            }

            if started.elapsed() >= budget {
                return Err(WorkflowError::DependencyTimeout {
                    branch_id: branch_id.to_string(),
                    waited_ms: budget.as_millis() as u64,
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Blast-radius handling for a branch-fatal failure: advise every other
    /// registered branch to pause/cleanup, mark anything still processing as
    /// errored, and mark the plan's never-started dependents as errored too.
    async fn handle_global_error(
        &self,
        source_branch: &str,
        never_started: &[String],
        workflow_error: &WorkflowError,
    ) {
        error!(
            source_branch = %source_branch,
            error = %workflow_error,
            "🚨 Branch-fatal error; aborting plan"
        );

        self.broadcast(
            source_branch,
            CrossBranchMessageType::Error,
            json!({
                "error_message": workflow_error.to_string(),
                "action": "pause_and_cleanup",
            }),
        )
        .await;

        let processing: Vec<String> = self
            .branch_statuses
            .read()
            .values()
            .filter(|status| status.status == BranchState::Processing)
            .map(|status| status.branch_id.clone())
            .collect();
        for branch_id in processing {
            self.update_branch_status(&branch_id, BranchState::Error, None);
        }
        for branch_id in never_started {
            self.update_branch_status(branch_id, BranchState::Error, None);
        }
    }

    /// Reset a single failed branch and re-execute it in isolation.
    /// Dependents are not re-run automatically.
    pub async fn retry_failed_branch(&self, branch_id: &str) -> Result<(), WorkflowError> {
        let current = self.branch_state(branch_id);
        if current != Some(BranchState::Error) {
            return Err(WorkflowError::BranchNotInError {
                branch_id: branch_id.to_string(),
                current_state: current
                    .map(|state| state.to_string())
                    .unwrap_or_else(|| "unregistered".to_string()),
            });
        }

        let unit = self.branch_units.read().get(branch_id).cloned().ok_or_else(|| {
            WorkflowError::BranchNotRegistered {
                branch_id: branch_id.to_string(),
            }
        })?;

        info!(branch_id = %branch_id, "🔄 Retrying failed branch");
        self.update_branch_status(branch_id, BranchState::Idle, Some(0));
        self.update_branch_status(branch_id, BranchState::Processing, None);

        match unit.execute().await {
            Ok(()) => {
                self.update_branch_status(branch_id, BranchState::Completed, Some(100));
                info!(branch_id = %branch_id, "✅ Successfully retried branch");
                Ok(())
            }
            Err(e) => {
                self.update_branch_status(branch_id, BranchState::Error, None);
                Err(WorkflowError::BranchFailed {
                    branch_id: branch_id.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Deliver a message to its target branch and append it to the log.
    /// Delivery is advisory: a rejection is traced, never propagated.
    pub async fn send_message(&self, message: CrossBranchMessage) {
        let unit = self.branch_units.read().get(&message.to_branch).cloned();
        info!(
            from = %message.from_branch,
            to = %message.to_branch,
            message_type = %message.message_type,
            "📨 Cross-branch message"
        );
        self.message_log.lock().push(message.clone());

        if let Some(unit) = unit {
            if let Err(e) = unit.receive_message(message).await {
                warn!(error = %e, "Branch rejected advisory message");
            }
        }
    }

    /// Send a message to every registered branch except `from_branch`.
    pub async fn broadcast(
        &self,
        from_branch: &str,
        message_type: CrossBranchMessageType,
        payload: Value,
    ) {
        let targets: Vec<String> = self
            .branch_units
            .read()
            .keys()
            .filter(|branch_id| branch_id.as_str() != from_branch)
            .cloned()
            .collect();

        for to_branch in targets {
            self.send_message(CrossBranchMessage::new(
                from_branch,
                to_branch,
                message_type,
                payload.clone(),
            ))
            .await;
        }
    }

    fn update_branch_status(&self, branch_id: &str, state: BranchState, progress: Option<u8>) {
        let mut statuses = self.branch_statuses.write();
        if let Some(status) = statuses.get_mut(branch_id) {
            status.status = state;
            status.last_activity = Utc::now();
            if let Some(progress) = progress {
                status.progress_percentage = progress;
            }
            if state == BranchState::Error {
                status.error_count += 1;
            }
        }
    }

    pub fn branch_state(&self, branch_id: &str) -> Option<BranchState> {
        self.branch_statuses
            .read()
            .get(branch_id)
            .map(|status| status.status)
    }

    pub fn branch_status(&self, branch_id: &str) -> Option<BranchStatus> {
        self.branch_statuses.read().get(branch_id).cloned()
    }

    /// Aggregate view across all branches: errored if anything errored, then
    /// processing, then completed once every non-idle branch finished.
    pub fn project_status(&self) -> ProjectStatus {
        let statuses = self.branch_statuses.read();
        let all: Vec<BranchStatus> = statuses.values().cloned().collect();
        let active: Vec<&BranchStatus> = all
            .iter()
            .filter(|status| status.status != BranchState::Idle)
            .collect();

        let overall_status = if active.iter().any(|s| s.status == BranchState::Error) {
            BranchState::Error
        } else if active.iter().any(|s| s.status == BranchState::Processing) {
            BranchState::Processing
        } else if !active.is_empty() && active.iter().all(|s| s.status == BranchState::Completed) {
            BranchState::Completed
        } else {
            BranchState::Idle
        };

        let overall_progress = if all.is_empty() {
            0
        } else {
            (all.iter()
                .map(|s| s.progress_percentage as u32)
                .sum::<u32>()
                / all.len() as u32) as u8
        };

        ProjectStatus {
            overall_status,
            overall_progress,
            branches: all,
        }
    }

    /// Snapshot of every message sent through this planner.
    pub fn message_history(&self) -> Vec<CrossBranchMessage> {
        self.message_log.lock().clone()
    }

    /// Broadcast a shutdown advisory and clear branch registrations.
    pub async fn shutdown(&self) {
        info!("🛑 Shutting down execution planner");
        self.broadcast(
            branches::MASTER,
            CrossBranchMessageType::RequestStatus,
            json!({"action": "shutdown"}),
        )
        .await;
        self.branch_units.write().clear();
        self.message_log.lock().clear();
        info!("✅ Execution planner shutdown complete");
    }

    fn require_registered(&self, plan: &OrchestrationPlan) -> Result<(), WorkflowError> {
        let units = self.branch_units.read();
        for branch_id in &plan.active_branches {
            if !units.contains_key(branch_id) {
                return Err(WorkflowError::BranchNotRegistered {
                    branch_id: branch_id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Check that every branch runs after all of its declared dependencies and
/// that the order covers exactly the active branches.
fn validate_execution_order(plan: &OrchestrationPlan) -> Result<(), WorkflowError> {
    let positions: HashMap<&str, usize> = plan
        .execution_order
        .iter()
        .enumerate()
        .map(|(index, branch_id)| (branch_id.as_str(), index))
        .collect();

    for branch_id in &plan.active_branches {
        let Some(&branch_position) = positions.get(branch_id.as_str()) else {
            return Err(WorkflowError::InvalidExecutionOrder {
                plan_id: plan.id.clone(),
                branch_id: branch_id.clone(),
                dependency: "<missing from execution order>".to_string(),
            });
        };
        for dependency in plan.dependencies_of(branch_id) {
            match positions.get(dependency.as_str()) {
                Some(&dependency_position) if dependency_position < branch_position => {}
                _ => {
                    return Err(WorkflowError::InvalidExecutionOrder {
                        plan_id: plan.id.clone(),
                        branch_id: branch_id.clone(),
                        dependency: dependency.clone(),
                    })
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_plans_pass_validation() {
        for plan_type in [
            PlanType::FullPipeline,
            PlanType::LeadOnly,
            PlanType::MessagingOnly,
        ] {
            let plan = OrchestrationPlan::for_plan_type(plan_type);
            assert!(validate_execution_order(&plan).is_ok(), "{plan_type}");
        }
    }

    #[test]
    fn test_validation_rejects_dependency_after_dependent() {
        let mut plan = OrchestrationPlan::for_plan_type(PlanType::LeadOnly);
        plan.execution_order.reverse();
        let err = validate_execution_order(&plan).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidExecutionOrder { .. }));
    }

    #[test]
    fn test_validation_rejects_branch_missing_from_order() {
        let mut plan = OrchestrationPlan::for_plan_type(PlanType::LeadOnly);
        plan.execution_order.pop();
        assert!(validate_execution_order(&plan).is_err());
    }

    #[test]
    fn test_planner_seeds_all_known_branches() {
        let planner = ExecutionPlanner::new(OrchestrationConfig::default());
        for branch_id in branches::ALL {
            assert_eq!(planner.branch_state(branch_id), Some(BranchState::Idle));
        }
    }

    #[tokio::test]
    async fn test_dependency_wait_times_out_within_budget() {
        let config = OrchestrationConfig {
            dependency_poll_interval_ms: 10,
            dependency_max_wait_ms: 50,
            ..OrchestrationConfig::default()
        };
        let planner = ExecutionPlanner::new(config);

        // The branch stays idle, so the bounded poll must exhaust its budget.
        let err = planner
            .wait_for_completion(branches::DATA_INGESTION)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::DependencyTimeout { waited_ms: 50, .. }
        ));
    }

    #[tokio::test]
    async fn test_dependency_wait_fails_fast_on_errored_dependency() {
        let planner = ExecutionPlanner::new(OrchestrationConfig::default());
        planner.update_branch_status(branches::DATA_INGESTION, BranchState::Error, None);

        let err = planner
            .wait_for_completion(branches::DATA_INGESTION)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::DependencyFailed { .. }));
    }
}
