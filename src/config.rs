use crate::error::{OrchestratorError, Result};

/// Tunable timing and batching knobs for the orchestration core.
///
/// Defaults mirror the reference deployment: 30s heartbeats, retry drains of
/// ten events, one-second dependency polling with a five-minute budget.
#[derive(Debug, Clone)]
pub struct OrchestrationConfig {
    /// Interval between liveness heartbeats, in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Maximum events popped per retry-drain cycle.
    pub retry_batch_size: usize,
    /// Interval between retry-drain cycles, in milliseconds.
    pub retry_drain_interval_ms: u64,
    /// Poll interval while waiting on a dependency branch, in milliseconds.
    pub dependency_poll_interval_ms: u64,
    /// Maximum total wait for a dependency branch before the workflow is
    /// failed, in milliseconds.
    pub dependency_max_wait_ms: u64,
    /// How many known registry keys to include in unmapped-key diagnostics.
    pub registry_diagnostic_keys: usize,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 30_000,
            retry_batch_size: 10,
            retry_drain_interval_ms: 60_000,
            dependency_poll_interval_ms: 1_000,
            dependency_max_wait_ms: 300_000,
            registry_diagnostic_keys: 10,
        }
    }
}

impl OrchestrationConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(interval) = std::env::var("OUTREACH_HEARTBEAT_INTERVAL_MS") {
            config.heartbeat_interval_ms = interval.parse().map_err(|e| {
                OrchestratorError::ConfigurationError(format!("Invalid heartbeat_interval_ms: {e}"))
            })?;
        }

        if let Ok(batch) = std::env::var("OUTREACH_RETRY_BATCH_SIZE") {
            config.retry_batch_size = batch.parse().map_err(|e| {
                OrchestratorError::ConfigurationError(format!("Invalid retry_batch_size: {e}"))
            })?;
        }

        if let Ok(interval) = std::env::var("OUTREACH_RETRY_DRAIN_INTERVAL_MS") {
            config.retry_drain_interval_ms = interval.parse().map_err(|e| {
                OrchestratorError::ConfigurationError(format!(
                    "Invalid retry_drain_interval_ms: {e}"
                ))
            })?;
        }

        if let Ok(poll) = std::env::var("OUTREACH_DEPENDENCY_POLL_INTERVAL_MS") {
            config.dependency_poll_interval_ms = poll.parse().map_err(|e| {
                OrchestratorError::ConfigurationError(format!(
                    "Invalid dependency_poll_interval_ms: {e}"
                ))
            })?;
        }

        if let Ok(max_wait) = std::env::var("OUTREACH_DEPENDENCY_MAX_WAIT_MS") {
            config.dependency_max_wait_ms = max_wait.parse().map_err(|e| {
                OrchestratorError::ConfigurationError(format!("Invalid dependency_max_wait_ms: {e}"))
            })?;
        }

        if let Ok(keys) = std::env::var("OUTREACH_REGISTRY_DIAGNOSTIC_KEYS") {
            config.registry_diagnostic_keys = keys.parse().map_err(|e| {
                OrchestratorError::ConfigurationError(format!(
                    "Invalid registry_diagnostic_keys: {e}"
                ))
            })?;
        }

        Ok(config)
    }
}
