use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Webhook event types recognized by the router.
///
/// Each type maps to exactly one queue transition (or a small fixed sequence)
/// plus a notification to the downstream branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Raw lead ingestion finished; records are ready for canonicalization
    IngestDone,
    /// Contact scraping finished; records are ready for validation
    ScrapeDone,
    /// Validation finished (payload carries success flag)
    ValidateDone,
    /// A composed message passed approval and is ready for delivery
    MessageReady,
    /// Delivery attempt result (payload carries success + retryable flags)
    SendResult,
    /// An inbound reply was captured
    ReplyEvent,
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IngestDone => write!(f, "ingest_done"),
            Self::ScrapeDone => write!(f, "scrape_done"),
            Self::ValidateDone => write!(f, "validate_done"),
            Self::MessageReady => write!(f, "message_ready"),
            Self::SendResult => write!(f, "send_result"),
            Self::ReplyEvent => write!(f, "reply_event"),
        }
    }
}

impl std::str::FromStr for WebhookEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingest_done" => Ok(Self::IngestDone),
            "scrape_done" => Ok(Self::ScrapeDone),
            "validate_done" => Ok(Self::ValidateDone),
            "message_ready" => Ok(Self::MessageReady),
            "send_result" => Ok(Self::SendResult),
            "reply_event" => Ok(Self::ReplyEvent),
            _ => Err(format!("Invalid webhook event type: {s}")),
        }
    }
}

/// A typed event produced by an external signal source.
///
/// `unique_id` must resolve to exactly one process key reference whose
/// `process_id` matches the declared one; otherwise the event is
/// dead-lettered without retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_type: WebhookEventType,
    pub payload: Value,
    pub source_branch: String,
    pub timestamp: DateTime<Utc>,
    pub unique_id: String,
    pub process_id: String,
}

impl WebhookEvent {
    pub fn new(
        event_type: WebhookEventType,
        payload: Value,
        source_branch: impl Into<String>,
        unique_id: impl Into<String>,
        process_id: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            payload,
            source_branch: source_branch.into(),
            timestamp: Utc::now(),
            unique_id: unique_id.into(),
            process_id: process_id.into(),
        }
    }

    /// Copy of this event with a refreshed timestamp, used when re-enqueueing
    /// for retry.
    pub fn refreshed(&self) -> Self {
        Self {
            timestamp: Utc::now(),
            ..self.clone()
        }
    }

    /// Record ids carried under the given payload key, tolerating absence.
    pub fn payload_ids(&self, key: &str) -> Vec<String> {
        self.payload
            .get(key)
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Boolean payload flag, defaulting to `false` when absent.
    pub fn payload_flag(&self, key: &str) -> bool {
        self.payload
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_string_conversion() {
        assert_eq!(WebhookEventType::IngestDone.to_string(), "ingest_done");
        assert_eq!(
            "send_result".parse::<WebhookEventType>().unwrap(),
            WebhookEventType::SendResult
        );
        assert!("unknown_event".parse::<WebhookEventType>().is_err());
    }

    #[test]
    fn test_event_type_serde() {
        let json = serde_json::to_string(&WebhookEventType::ValidateDone).unwrap();
        assert_eq!(json, "\"validate_done\"");
        let parsed: WebhookEventType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, WebhookEventType::ValidateDone);
    }

    #[test]
    fn test_refreshed_updates_only_timestamp() {
        let event = WebhookEvent::new(
            WebhookEventType::SendResult,
            json!({"message_ids": ["m1"]}),
            "03-delivery",
            "uid-1",
            "proc-1",
        );
        let refreshed = event.refreshed();
        assert!(refreshed.timestamp >= event.timestamp);
        assert_eq!(refreshed.unique_id, event.unique_id);
        assert_eq!(refreshed.payload, event.payload);
    }

    #[test]
    fn test_payload_ids_tolerates_missing_and_mixed() {
        let event = WebhookEvent::new(
            WebhookEventType::IngestDone,
            json!({"record_ids": ["a", 7, "b"]}),
            "00-data-ingestion",
            "uid-1",
            "proc-1",
        );
        assert_eq!(event.payload_ids("record_ids"), vec!["a", "b"]);
        assert!(event.payload_ids("slot_ids").is_empty());
        assert!(!event.payload_flag("success"));
    }
}
