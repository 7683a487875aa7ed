//! WebhookEventLog port - append-only record of every verified provider event.
//!
//! The unique `(provider, event_id)` key is the idempotency mechanism:
//! providers deliver at least once and in no particular order, so a second
//! delivery must insert nothing and the handler must decide, from the stored
//! row, whether the transition still needs to run.
//!
//! Rows are written with `processed = false` and flipped once the handler
//! finishes. A delivery whose earlier attempt crashed between logging and
//! transition finds the row unprocessed and re-attempts the transition.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::billing::{PaymentProviderKind, ProviderEvent};
use crate::domain::foundation::{DomainError, Timestamp};

/// Stored webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEventRecord {
    pub provider: PaymentProviderKind,
    pub event_id: String,
    pub event_type: String,
    /// Full raw payload, kept for replay and debugging.
    pub payload: Value,
    pub processed: bool,
    pub processed_at: Option<Timestamp>,
    /// Handler error from the most recent attempt, if it failed.
    pub error: Option<String>,
    pub received_at: Timestamp,
}

impl WebhookEventRecord {
    /// New, unprocessed record for a verified event.
    pub fn received(event: &ProviderEvent, now: Timestamp) -> Self {
        Self {
            provider: event.provider,
            event_id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            payload: event.payload.clone(),
            processed: false,
            processed_at: None,
            error: None,
            received_at: now,
        }
    }
}

/// Result of `record_once`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// First time this `(provider, event_id)` was seen.
    pub is_new: bool,
    /// An earlier delivery already finished processing this event.
    pub already_processed: bool,
}

impl RecordOutcome {
    pub fn inserted() -> Self {
        Self {
            is_new: true,
            already_processed: false,
        }
    }

    pub fn duplicate(already_processed: bool) -> Self {
        Self {
            is_new: false,
            already_processed,
        }
    }

    /// Whether the handler should run the event's transition.
    pub fn should_process(&self) -> bool {
        !self.already_processed
    }
}

/// Port for the webhook event log.
#[async_trait]
pub trait WebhookEventLog: Send + Sync {
    /// Inserts the event unless its `(provider, event_id)` already exists.
    ///
    /// Must be a single conflict-ignoring insert so concurrent deliveries
    /// of one event produce exactly one row.
    async fn record_once(&self, event: &ProviderEvent) -> Result<RecordOutcome, DomainError>;

    /// Marks the event processed and clears any stored error.
    async fn mark_processed(
        &self,
        provider: PaymentProviderKind,
        event_id: &str,
    ) -> Result<(), DomainError>;

    /// Records a handler failure; the event stays unprocessed.
    async fn mark_failed(
        &self,
        provider: PaymentProviderKind,
        event_id: &str,
        error: &str,
    ) -> Result<(), DomainError>;

    /// Looks up a stored event.
    async fn find(
        &self,
        provider: PaymentProviderKind,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::EventKind;
    use serde_json::json;

    fn event() -> ProviderEvent {
        ProviderEvent {
            provider: PaymentProviderKind::Stripe,
            event_id: "evt_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            kind: EventKind::Ignored,
            payload: json!({"id": "evt_123"}),
        }
    }

    #[test]
    fn received_record_starts_unprocessed() {
        let now = Timestamp::now();
        let record = WebhookEventRecord::received(&event(), now);
        assert!(!record.processed);
        assert!(record.processed_at.is_none());
        assert_eq!(record.received_at, now);
        assert_eq!(record.payload["id"], "evt_123");
    }

    #[test]
    fn only_processed_duplicates_are_skipped() {
        assert!(RecordOutcome::inserted().should_process());
        assert!(RecordOutcome::duplicate(false).should_process());
        assert!(!RecordOutcome::duplicate(true).should_process());
    }
}
