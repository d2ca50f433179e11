//! # Event Failure Classification
//!
//! Classifies per-event processing failures as transient or permanent to
//! decide between the retry buffer and the dead-letter buffer.
//!
//! The shipped policy matches the failure message against a fixed allow-list
//! of transient phrases. This is a placeholder policy: explicit error codes
//! from the database executor contract should replace substring matching once
//! the executor exposes them (the classifier seam exists so the router does
//! not change when that happens).

use crate::orchestration::errors::ProcessingError;
use serde::{Deserialize, Serialize};

/// Failure phrases treated as transient. Anything else is permanent.
pub const TRANSIENT_PHRASES: &[&str] = &[
    "connection timeout",
    "temporary network error",
    "rate limit exceeded",
    "service unavailable",
];

/// Routing decision for a failed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDisposition {
    /// One additional attempt via the retry buffer.
    Retryable,
    /// Straight to dead-letter; requires manual intervention.
    Permanent,
}

impl std::fmt::Display for ErrorDisposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retryable => write!(f, "retryable"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// Substring-based transient/permanent classifier.
#[derive(Debug, Clone, Default)]
pub struct RetryClassifier;

impl RetryClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a processing failure.
    ///
    /// Authorization failures (unmapped key, process id mismatch) are always
    /// permanent regardless of message content.
    pub fn classify(&self, error: &ProcessingError) -> ErrorDisposition {
        if error.is_authorization_failure() {
            return ErrorDisposition::Permanent;
        }
        self.classify_message(&error.to_string())
    }

    /// Classify an arbitrary failure message.
    pub fn classify_message(&self, message: &str) -> ErrorDisposition {
        let lowered = message.to_lowercase();
        if TRANSIENT_PHRASES
            .iter()
            .any(|phrase| lowered.contains(phrase))
        {
            ErrorDisposition::Retryable
        } else {
            ErrorDisposition::Permanent
        }
    }
}
