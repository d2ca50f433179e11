//! # System Constants
//!
//! Core constants that define the operational boundaries of the outreach
//! orchestration core: queue names, per-queue status vocabularies, and the
//! identifiers used by the diagnostics sinks.
//!
//! Queue names are `schema.table` pairs; each queue table carries a `status`
//! column acting as a per-record state machine.

/// Named queues the event router addresses.
///
/// Every queue listed in [`queues::REQUIRED`] must be reachable before router
/// initialization is considered complete.
pub mod queues {
    pub const LEAD_QUEUE: &str = "outreach.lead_queue";
    pub const COMPOSE_QUEUE: &str = "messaging.compose_queue";
    pub const APPROVAL_QUEUE: &str = "messaging.approval_queue";
    pub const SEND_QUEUE: &str = "delivery.send_queue";
    pub const REPLY_QUEUE: &str = "delivery.reply_queue";

    /// Queues probed at router startup. Any unreachable entry is fatal.
    pub const REQUIRED: &[&str] = &[
        LEAD_QUEUE,
        COMPOSE_QUEUE,
        APPROVAL_QUEUE,
        SEND_QUEUE,
        REPLY_QUEUE,
    ];
}

/// Status values used as per-record state machines on the queue tables.
///
/// These are open vocabularies (each queue uses a subset); the orchestration
/// core only ever moves records between the statuses named here.
pub mod queue_status {
    pub const PENDING: &str = "pending";
    pub const INGESTING: &str = "ingesting";
    pub const QUEUED: &str = "queued";
    pub const SCRAPING: &str = "scraping";
    pub const VALIDATING: &str = "validating";
    pub const SENDING: &str = "sending";
    pub const SENT: &str = "sent";
    pub const ERROR: &str = "error";
}

/// Branch identifiers for the fixed plan catalogue.
pub mod branches {
    pub const DATA_INGESTION: &str = "00-data-ingestion";
    pub const LEAD_INTAKE: &str = "01-lead-intake";
    pub const MESSAGING: &str = "02-messaging";
    pub const DELIVERY: &str = "03-delivery";
    pub const SCHEDULING: &str = "04-scheduling";
    pub const FEEDBACK: &str = "05-feedback";
    pub const COMPLIANCE: &str = "06-compliance";
    pub const DATA_VAULT: &str = "07-data-vault";

    /// All branches known to the planner; each gets a status entry at startup.
    pub const ALL: &[&str] = &[
        DATA_INGESTION,
        LEAD_INTAKE,
        MESSAGING,
        DELIVERY,
        SCHEDULING,
        FEEDBACK,
        COMPLIANCE,
        DATA_VAULT,
    ];

    /// Sender id used on planner-originated cross-branch messages.
    pub const MASTER: &str = "master";
}

/// System-level identifiers shared by the diagnostics sinks.
pub mod system {
    pub const ROUTER_AGENT_ID: &str = "overall-orchestrator";
    pub const PLANNER_AGENT_ID: &str = "master-orchestrator";
    pub const BLUEPRINT_VERSION: &str = "v1.0.0";

    /// Database connection name every orchestration operation targets.
    pub const CONNECTION: &str = "marketing";

    pub const REGISTRY_SCHEMA: &str = "shq";
    pub const PROCESS_KEY_TABLE: &str = "process_key_reference";
    pub const ERROR_LOG_TABLE: &str = "master_error_log";
    pub const HEARTBEAT_TABLE: &str = "heartbeat_log";
}

/// Heartbeat type tags emitted by the router lifecycle.
pub mod heartbeats {
    pub const ORCHESTRATOR_ALIVE: &str = "orchestrator_alive";
    pub const WEBHOOK_PROCESSED: &str = "webhook_processed";
    pub const ORCHESTRATOR_SHUTDOWN: &str = "orchestrator_shutdown";
}

/// Error type tags written to the error sink.
pub mod error_types {
    pub const PROCESS_KEY_UNMAPPED: &str = "process_key_unmapped";
    pub const PROCESS_ID_MISMATCH: &str = "process_id_mismatch";
    pub const QUEUE_TRANSITION_FAILED: &str = "queue_transition_failed";
    pub const WEBHOOK_PROCESSING_FAILED: &str = "webhook_processing_failed";
    pub const RETRY_EXHAUSTED: &str = "retry_exhausted";
}
