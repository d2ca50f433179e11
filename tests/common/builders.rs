//! Test builders: webhook events and scripted branch units.

use async_trait::async_trait;
use outreach_core::orchestration::{BranchUnit, CrossBranchMessage};
use outreach_core::state_machine::BranchState;
use outreach_core::events::{WebhookEvent, WebhookEventType};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

pub fn webhook_event(
    event_type: WebhookEventType,
    payload: Value,
    unique_id: &str,
    process_id: &str,
) -> WebhookEvent {
    WebhookEvent::new(event_type, payload, "test-source", unique_id, process_id)
}

pub fn send_result_event(message_ids: &[&str], success: bool, retryable: bool) -> WebhookEvent {
    webhook_event(
        WebhookEventType::SendResult,
        json!({
            "message_ids": message_ids,
            "success": success,
            "retryable": retryable,
        }),
        "uid-send",
        "proc-send",
    )
}

/// Shared recorder used to assert branch execution ordering.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

pub fn execution_log() -> ExecutionLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Branch unit with a scripted sequence of execute outcomes.
///
/// Outcomes are consumed front to back; once exhausted, execution succeeds.
pub struct ScriptedBranch {
    branch_id: String,
    outcomes: Mutex<VecDeque<Result<(), String>>>,
    received: Mutex<Vec<CrossBranchMessage>>,
    log: Option<ExecutionLog>,
}

impl ScriptedBranch {
    pub fn succeeding(branch_id: &str) -> Arc<Self> {
        Arc::new(Self {
            branch_id: branch_id.to_string(),
            outcomes: Mutex::new(VecDeque::new()),
            received: Mutex::new(Vec::new()),
            log: None,
        })
    }

    pub fn with_outcomes(branch_id: &str, outcomes: Vec<Result<(), String>>) -> Arc<Self> {
        Arc::new(Self {
            branch_id: branch_id.to_string(),
            outcomes: Mutex::new(outcomes.into()),
            received: Mutex::new(Vec::new()),
            log: None,
        })
    }

    pub fn logged(branch_id: &str, log: ExecutionLog) -> Arc<Self> {
        Arc::new(Self {
            branch_id: branch_id.to_string(),
            outcomes: Mutex::new(VecDeque::new()),
            received: Mutex::new(Vec::new()),
            log: Some(log),
        })
    }

    pub fn failing_once(branch_id: &str, reason: &str, log: ExecutionLog) -> Arc<Self> {
        Arc::new(Self {
            branch_id: branch_id.to_string(),
            outcomes: Mutex::new(VecDeque::from([Err(reason.to_string())])),
            received: Mutex::new(Vec::new()),
            log: Some(log),
        })
    }

    pub fn received_messages(&self) -> Vec<CrossBranchMessage> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl BranchUnit for ScriptedBranch {
    fn id(&self) -> String {
        self.branch_id.clone()
    }

    async fn execute(&self) -> anyhow::Result<()> {
        if let Some(log) = &self.log {
            log.lock().push(self.branch_id.clone());
        }
        match self.outcomes.lock().pop_front() {
            Some(Err(reason)) => Err(anyhow::anyhow!(reason)),
            _ => Ok(()),
        }
    }

    async fn receive_message(&self, message: CrossBranchMessage) -> anyhow::Result<()> {
        self.received.lock().push(message);
        Ok(())
    }

    fn status(&self) -> BranchState {
        BranchState::Idle
    }
}

/// Branch unit that rejects every notification with a fixed error message.
pub struct RejectingBranch {
    branch_id: String,
    reason: String,
}

impl RejectingBranch {
    pub fn new(branch_id: &str, reason: &str) -> Arc<Self> {
        Arc::new(Self {
            branch_id: branch_id.to_string(),
            reason: reason.to_string(),
        })
    }
}

#[async_trait]
impl BranchUnit for RejectingBranch {
    fn id(&self) -> String {
        self.branch_id.clone()
    }

    async fn execute(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn receive_message(&self, _message: CrossBranchMessage) -> anyhow::Result<()> {
        Err(anyhow::anyhow!(self.reason.clone()))
    }

    fn status(&self) -> BranchState {
        BranchState::Idle
    }
}
