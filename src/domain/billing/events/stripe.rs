//! Stripe webhook wire format.
//!
//! Only fields the engine reads are captured; the rest of the event is kept
//! verbatim in `ProviderEvent::payload`.

use serde::Deserialize;
use serde_json::Value;

use super::{parse_error, Correlation, EventKind, ProviderEvent};
use crate::domain::billing::{BillingError, PaymentProof, PaymentProviderKind};

/// Reason recorded when Stripe reports a failed or lapsed checkout.
pub const STRIPE_FAILURE_REASON: &str = "Stripe payment failed";

/// Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    /// Event id (`evt_...`).
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,
}

/// Container for the object that triggered the event.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

impl StripeEvent {
    fn metadata(&self) -> &Value {
        self.data.object.get("metadata").unwrap_or(&Value::Null)
    }

    /// `payment_intent` is an id string, or the object itself when expanded.
    fn payment_intent_id(&self) -> Option<String> {
        match self.data.object.get("payment_intent")? {
            Value::String(id) => Some(id.clone()),
            Value::Object(obj) => obj.get("id").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    }

    fn payment_status(&self) -> Option<&str> {
        self.data.object.get("payment_status").and_then(Value::as_str)
    }

    fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
                if self.payment_status() == Some("unpaid") {
                    return EventKind::Unactionable(
                        "checkout completed but payment is still processing".to_string(),
                    );
                }
                match Correlation::from_metadata(self.metadata()) {
                    Some(correlation) => EventKind::PaymentSucceeded {
                        correlation,
                        proof: PaymentProof::stripe(self.payment_intent_id()),
                    },
                    None => EventKind::Unactionable("missing checkout metadata".to_string()),
                }
            }
            "payment_intent.payment_failed"
            | "checkout.session.expired"
            | "checkout.session.async_payment_failed" => {
                match Correlation::from_metadata(self.metadata()) {
                    Some(correlation) => EventKind::PaymentFailed {
                        correlation,
                        reason: STRIPE_FAILURE_REASON.to_string(),
                    },
                    None => EventKind::Unactionable("missing checkout metadata".to_string()),
                }
            }
            _ => EventKind::Ignored,
        }
    }
}

pub(super) fn parse(payload: &[u8]) -> Result<ProviderEvent, BillingError> {
    let raw: Value = serde_json::from_slice(payload)
        .map_err(|e| parse_error(PaymentProviderKind::Stripe, e))?;
    let event: StripeEvent = serde_json::from_value(raw.clone())
        .map_err(|e| parse_error(PaymentProviderKind::Stripe, e))?;

    Ok(ProviderEvent {
        provider: PaymentProviderKind::Stripe,
        kind: event.kind(),
        event_id: event.id,
        event_type: event.event_type,
        payload: raw,
    })
}
