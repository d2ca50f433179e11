//! # Event Router
//!
//! Consumes typed webhook events: verifies them against the process key
//! registry, performs the status-guarded queue transition(s) for the event
//! type, and notifies the downstream branch. Failures are classified into
//! retry vs. dead-letter paths; successes emit a `webhook_processed`
//! heartbeat.
//!
//! ## Lifecycle
//!
//! `initialize` must succeed before any event is accepted: it loads the
//! process key cache (fatal on failure) and probes every required queue
//! (fatal on failure). `start_background_tasks` then spawns the liveness
//! heartbeat and retry-drain timers; each timer tick awaits the prior tick's
//! work, so at most one invocation of either runs at a time.

use crate::config::OrchestrationConfig;
use crate::constants::{branches, error_types, heartbeats, queue_status, queues, system};
use crate::database::DatabaseExecutor;
use crate::diagnostics::{ErrorSink, HeartbeatEmitter};
use crate::events::{WebhookEvent, WebhookEventType};
use crate::orchestration::error_classifier::{ErrorDisposition, RetryClassifier};
use crate::orchestration::errors::ProcessingError;
use crate::orchestration::queue_transition::{QueueTransitionManager, TransitionContext};
use crate::orchestration::retry::{DeadLetterQueue, RetryQueue};
use crate::orchestration::types::{BranchUnit, CrossBranchMessage, CrossBranchMessageType};
use crate::registry::ProcessKeyRegistry;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Point-in-time router state for operator inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterStatus {
    pub agent_id: String,
    pub process_keys_loaded: usize,
    pub retry_queue_size: usize,
    pub dead_letter_queue_size: usize,
}

/// Routes webhook events through verification, queue transitions, and branch
/// notification.
pub struct EventRouter {
    config: OrchestrationConfig,
    registry: ProcessKeyRegistry,
    transitions: QueueTransitionManager,
    classifier: RetryClassifier,
    retry_queue: RetryQueue,
    dead_letters: DeadLetterQueue,
    heartbeat: HeartbeatEmitter,
    error_sink: ErrorSink,
    branch_units: RwLock<HashMap<String, Arc<dyn BranchUnit>>>,
    background_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl EventRouter {
    pub fn new(executor: Arc<dyn DatabaseExecutor>, config: OrchestrationConfig) -> Self {
        let error_sink = ErrorSink::new(Arc::clone(&executor), system::ROUTER_AGENT_ID);
        Self {
            registry: ProcessKeyRegistry::new(Arc::clone(&executor), config.registry_diagnostic_keys),
            transitions: QueueTransitionManager::new(Arc::clone(&executor), error_sink.clone()),
            classifier: RetryClassifier::new(),
            retry_queue: RetryQueue::new(),
            dead_letters: DeadLetterQueue::new(),
            heartbeat: HeartbeatEmitter::new(executor, system::ROUTER_AGENT_ID),
            error_sink,
            branch_units: RwLock::new(HashMap::new()),
            background_tasks: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Make a branch unit reachable for event notifications.
    pub fn register_branch(&self, unit: Arc<dyn BranchUnit>) {
        let branch_id = unit.id();
        info!(branch_id = %branch_id, "✅ Registered branch unit with event router");
        self.branch_units.write().insert(branch_id, unit);
    }

    /// Load the registry cache and verify every required queue is reachable.
    ///
    /// Both checks are fatal: the router must not accept events without the
    /// authorization table, and a missing queue is an initialization error,
    /// not a first-use surprise.
    pub async fn initialize(&self) -> Result<(), ProcessingError> {
        info!("🚀 Initializing event router");

        let loaded = self.registry.load().await?;
        debug!(process_keys = loaded, "Process key cache ready");

        for queue_name in queues::REQUIRED {
            self.transitions.probe_queue(queue_name).await?;
        }
        info!("✅ All required queues verified; event router ready");
        Ok(())
    }

    /// Process one webhook event end to end.
    ///
    /// On success a `webhook_processed` heartbeat is emitted. On failure the
    /// full event context is written to the error sink, then the event is
    /// routed: authorization failures go straight to dead-letter, everything
    /// else is classified into retry (one additional attempt) or dead-letter.
    pub async fn process(&self, event: &WebhookEvent) -> Result<(), ProcessingError> {
        info!(
            event_type = %event.event_type,
            source_branch = %event.source_branch,
            unique_id = %event.unique_id,
            "📨 Processing webhook event"
        );

        match self.process_inner(event).await {
            Ok(()) => {
                self.emit_processed_heartbeat(event).await;
                Ok(())
            }
            Err(error) => {
                self.record_event_failure(event, &error).await;
                if error.is_authorization_failure() {
                    self.dead_letters.enqueue(event);
                } else {
                    match self.classifier.classify(&error) {
                        ErrorDisposition::Retryable => self.retry_queue.enqueue(event),
                        ErrorDisposition::Permanent => self.dead_letters.enqueue(event),
                    }
                }
                Err(error)
            }
        }
    }

    /// Verification plus dispatch, shared by the first attempt and the
    /// retry-drain path.
    async fn process_inner(&self, event: &WebhookEvent) -> Result<(), ProcessingError> {
        self.registry.verify(&event.unique_id, &event.process_id)?;
        self.dispatch(event).await
    }

    async fn dispatch(&self, event: &WebhookEvent) -> Result<(), ProcessingError> {
        let context = TransitionContext {
            unique_id: event.unique_id.clone(),
            process_id: event.process_id.clone(),
        };

        match event.event_type {
            WebhookEventType::IngestDone => {
                self.transitions
                    .transition(
                        queues::LEAD_QUEUE,
                        &event.payload_ids("record_ids"),
                        queue_status::INGESTING,
                        queue_status::QUEUED,
                        &context,
                        None,
                    )
                    .await?;
                self.notify_branch(branches::LEAD_INTAKE, "canonicalize", event)
                    .await
            }
            WebhookEventType::ScrapeDone => {
                self.transitions
                    .transition(
                        queues::LEAD_QUEUE,
                        &event.payload_ids("slot_ids"),
                        queue_status::SCRAPING,
                        queue_status::VALIDATING,
                        &context,
                        None,
                    )
                    .await?;
                self.notify_branch(branches::LEAD_INTAKE, "validate", event)
                    .await
            }
            WebhookEventType::ValidateDone => {
                if event.payload_flag("success") {
                    self.transitions
                        .transition(
                            queues::COMPOSE_QUEUE,
                            &event.payload_ids("person_ids"),
                            queue_status::PENDING,
                            queue_status::QUEUED,
                            &context,
                            None,
                        )
                        .await?;
                    self.notify_branch(branches::MESSAGING, "persona_resolve", event)
                        .await
                } else {
                    let details = event
                        .payload
                        .get("error_details")
                        .and_then(serde_json::Value::as_str);
                    self.transitions
                        .transition(
                            queues::LEAD_QUEUE,
                            &event.payload_ids("person_ids"),
                            queue_status::VALIDATING,
                            queue_status::ERROR,
                            &context,
                            details,
                        )
                        .await?;
                    Ok(())
                }
            }
            WebhookEventType::MessageReady => {
                self.transitions
                    .transition(
                        queues::SEND_QUEUE,
                        &event.payload_ids("message_ids"),
                        queue_status::PENDING,
                        queue_status::QUEUED,
                        &context,
                        None,
                    )
                    .await?;
                self.notify_branch(branches::DELIVERY, "channel_map", event)
                    .await
            }
            WebhookEventType::SendResult => {
                if event.payload_flag("success") {
                    self.transitions
                        .transition(
                            queues::SEND_QUEUE,
                            &event.payload_ids("message_ids"),
                            queue_status::SENDING,
                            queue_status::SENT,
                            &context,
                            None,
                        )
                        .await?;
                } else {
                    let details = event
                        .payload
                        .get("error_details")
                        .and_then(serde_json::Value::as_str);
                    self.transitions
                        .transition(
                            queues::SEND_QUEUE,
                            &event.payload_ids("message_ids"),
                            queue_status::SENDING,
                            queue_status::ERROR,
                            &context,
                            details,
                        )
                        .await?;

                    // A failed send reported by the provider is handled here,
                    // not surfaced as a processing error: the event itself was
                    // consumed successfully.
                    if event.payload_flag("retryable") {
                        self.retry_queue.enqueue(event);
                    } else {
                        self.dead_letters.enqueue(event);
                    }
                }
                Ok(())
            }
            WebhookEventType::ReplyEvent => {
                let reply_ids: Vec<String> = event
                    .payload
                    .get("reply_id")
                    .and_then(serde_json::Value::as_str)
                    .map(|id| vec![id.to_string()])
                    .unwrap_or_default();
                self.transitions
                    .transition(
                        queues::REPLY_QUEUE,
                        &reply_ids,
                        queue_status::PENDING,
                        queue_status::QUEUED,
                        &context,
                        None,
                    )
                    .await?;
                self.notify_branch(branches::DELIVERY, "parse_reply", event)
                    .await
            }
        }
    }

    /// Deliver a `data_ready` notification to the downstream branch.
    ///
    /// An unregistered target is not an error (branches may run in another
    /// process and subscribe to the queues directly); a registered branch
    /// that rejects the notification is.
    async fn notify_branch(
        &self,
        branch_id: &str,
        action: &str,
        event: &WebhookEvent,
    ) -> Result<(), ProcessingError> {
        let unit = self.branch_units.read().get(branch_id).cloned();
        let Some(unit) = unit else {
            debug!(
                branch_id = %branch_id,
                action = %action,
                "🎯 No branch unit registered locally; skipping direct notification"
            );
            return Ok(());
        };

        let message = CrossBranchMessage::new(
            event.source_branch.clone(),
            branch_id,
            CrossBranchMessageType::DataReady,
            json!({
                "action": action,
                "event_type": event.event_type,
                "unique_id": event.unique_id,
                "process_id": event.process_id,
                "payload": event.payload,
            }),
        );

        unit.receive_message(message)
            .await
            .map_err(|e| ProcessingError::NotificationFailed {
                branch_id: branch_id.to_string(),
                reason: e.to_string(),
            })
    }

    /// Resubmit up to one batch of retry-buffer events through the full
    /// processing path. Any event that fails again goes straight to
    /// dead-letter regardless of classification. Returns the number of
    /// events attempted.
    pub async fn drain_retries(&self) -> usize {
        let batch = self.retry_queue.drain_batch(self.config.retry_batch_size);
        let attempted = batch.len();

        for event in batch {
            match self.process_inner(&event).await {
                Ok(()) => {
                    info!(event_type = %event.event_type, "✅ Retry successful");
                    self.emit_processed_heartbeat(&event).await;
                }
                Err(error) => {
                    warn!(
                        event_type = %event.event_type,
                        error = %error,
                        "❌ Retry failed; dead-lettering"
                    );
                    self.error_sink
                        .record(
                            error_types::RETRY_EXHAUSTED,
                            &format!("Retry failed for {} event: {error}", event.event_type),
                            json!({ "event": event }),
                            Some(&event.unique_id),
                            Some(&event.process_id),
                        )
                        .await;
                    self.dead_letters.enqueue(&event);
                }
            }
        }
        attempted
    }

    async fn emit_processed_heartbeat(&self, event: &WebhookEvent) {
        self.heartbeat
            .emit(
                heartbeats::WEBHOOK_PROCESSED,
                json!({
                    "event_type": event.event_type,
                    "source_branch": event.source_branch,
                    "unique_id": event.unique_id,
                }),
            )
            .await;
    }

    async fn record_event_failure(&self, event: &WebhookEvent, error: &ProcessingError) {
        let error_type = match error {
            ProcessingError::Registry(registry_error) => match registry_error {
                crate::orchestration::errors::RegistryError::ProcessIdMismatch { .. } => {
                    error_types::PROCESS_ID_MISMATCH
                }
                _ => error_types::PROCESS_KEY_UNMAPPED,
            },
            _ => error_types::WEBHOOK_PROCESSING_FAILED,
        };
        self.error_sink
            .record(
                error_type,
                &format!(
                    "Failed to process {} from {}: {error}",
                    event.event_type, event.source_branch
                ),
                json!({ "event": event, "error": error.to_string() }),
                Some(&event.unique_id),
                Some(&event.process_id),
            )
            .await;
    }

    /// Spawn the liveness heartbeat and retry-drain interval loops.
    ///
    /// Each loop awaits its own work before the next tick can fire, so no
    /// timer ever runs two invocations concurrently.
    pub fn start_background_tasks(self: &Arc<Self>) {
        let heartbeat_router = Arc::clone(self);
        let heartbeat_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(
                heartbeat_router.config.heartbeat_interval_ms,
            ));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                heartbeat_router
                    .heartbeat
                    .emit(
                        heartbeats::ORCHESTRATOR_ALIVE,
                        json!({
                            "retry_queue_size": heartbeat_router.retry_queue.len(),
                            "dead_letter_queue_size": heartbeat_router.dead_letters.len(),
                            "process_key_cache_size": heartbeat_router.registry.len(),
                        }),
                    )
                    .await;
            }
        });

        let drain_router = Arc::clone(self);
        let drain_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(
                drain_router.config.retry_drain_interval_ms,
            ));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let attempted = drain_router.drain_retries().await;
                if attempted > 0 {
                    debug!(attempted, "Retry drain cycle complete");
                }
            }
        });

        self.background_tasks
            .lock()
            .extend([heartbeat_task, drain_task]);
    }

    /// Stop background timers and emit a final heartbeat.
    pub async fn shutdown(&self) {
        info!("🛑 Shutting down event router");
        for task in self.background_tasks.lock().drain(..) {
            task.abort();
        }
        self.heartbeat
            .emit(
                heartbeats::ORCHESTRATOR_SHUTDOWN,
                json!({
                    "final_retry_queue_size": self.retry_queue.len(),
                    "final_dead_letter_size": self.dead_letters.len(),
                }),
            )
            .await;
        info!("✅ Event router shutdown complete");
    }

    pub fn status(&self) -> RouterStatus {
        RouterStatus {
            agent_id: system::ROUTER_AGENT_ID.to_string(),
            process_keys_loaded: self.registry.len(),
            retry_queue_size: self.retry_queue.len(),
            dead_letter_queue_size: self.dead_letters.len(),
        }
    }

    /// Registry handle, for on-demand cache refresh.
    pub fn registry(&self) -> &ProcessKeyRegistry {
        &self.registry
    }

    /// Snapshot of the dead-letter buffer for operator inspection.
    pub fn dead_letter_snapshot(&self) -> Vec<WebhookEvent> {
        self.dead_letters.snapshot()
    }

    pub fn retry_queue_len(&self) -> usize {
        self.retry_queue.len()
    }

    pub fn dead_letter_len(&self) -> usize {
        self.dead_letters.len()
    }
}
