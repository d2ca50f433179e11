//! # Structured Logging Module
//!
//! Environment-aware structured logging for debugging webhook routing and
//! multi-branch workflow execution.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        // Production emits JSON lines for log aggregation; everything else
        // gets the human-readable formatter.
        let fmt_layer = if environment == "production" {
            fmt::layer()
                .json()
                .with_target(true)
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        };
        let subscriber = tracing_subscriber::registry().with(fmt_layer);

        // Use try_init to avoid panic if a global subscriber already exists
        // (e.g. one installed by the embedding ingress process).
        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            environment = %environment,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("OUTREACH_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for queue transitions
pub fn log_queue_transition(
    queue_name: &str,
    record_id: &str,
    from_status: &str,
    to_status: &str,
    outcome: &str,
) {
    tracing::info!(
        queue = %queue_name,
        record_id = %record_id,
        from_status = %from_status,
        to_status = %to_status,
        outcome = %outcome,
        timestamp = %Utc::now().to_rfc3339(),
        "🔄 QUEUE_TRANSITION"
    );
}

/// Log structured data for registry operations
pub fn log_registry_operation(
    operation: &str,
    unique_id: Option<&str>,
    process_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        unique_id = unique_id,
        process_id = process_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📚 REGISTRY_OPERATION"
    );
}
