//! Razorpay webhook wire format.
//!
//! The event id normally arrives in the `x-razorpay-event-id` header; some
//! payloads also carry a top-level `id`. Without either, the id is derived
//! from the event name and payment id so redeliveries still collapse.

use serde::Deserialize;
use serde_json::Value;

use super::{parse_error, Correlation, EventKind, ProviderEvent};
use crate::domain::billing::{BillingError, PaymentProof, PaymentProviderKind};

/// Reason recorded when Razorpay does not supply one.
pub const RAZORPAY_FAILURE_REASON: &str = "Razorpay payment failed";

/// Razorpay webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayEvent {
    #[serde(default)]
    pub id: Option<String>,

    /// Event name, e.g. `payment.captured`.
    pub event: String,

    #[serde(default)]
    pub payload: RazorpayPayload,

    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RazorpayPayload {
    pub payment: Option<RazorpayEntity<RazorpayPayment>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayEntity<T> {
    pub entity: T,
}

/// Payment entity inside a payment event.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayPayment {
    pub id: String,

    pub order_id: Option<String>,

    /// Object of checkout notes, or `[]` when none were set.
    #[serde(default)]
    pub notes: Value,

    pub error_description: Option<String>,
}

impl RazorpayEvent {
    fn payment(&self) -> Option<&RazorpayPayment> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }

    fn kind(&self) -> EventKind {
        let Some(payment) = self.payment() else {
            return match self.event.as_str() {
                "payment.captured" | "payment.failed" => {
                    EventKind::Unactionable("missing payment entity".to_string())
                }
                _ => EventKind::Ignored,
            };
        };

        match self.event.as_str() {
            "payment.captured" => match Correlation::from_metadata(&payment.notes) {
                Some(correlation) => EventKind::PaymentSucceeded {
                    correlation,
                    proof: PaymentProof::razorpay(payment.id.clone(), payment.order_id.clone()),
                },
                None => EventKind::Unactionable("missing checkout notes".to_string()),
            },
            "payment.failed" => match Correlation::from_metadata(&payment.notes) {
                Some(correlation) => EventKind::PaymentFailed {
                    correlation,
                    reason: payment
                        .error_description
                        .clone()
                        .filter(|d| !d.trim().is_empty())
                        .unwrap_or_else(|| RAZORPAY_FAILURE_REASON.to_string()),
                },
                None => EventKind::Unactionable("missing checkout notes".to_string()),
            },
            _ => EventKind::Ignored,
        }
    }

    fn derived_event_id(&self) -> Option<String> {
        let body_id = self.id.as_deref().map(str::trim).filter(|id| !id.is_empty());
        if let Some(id) = body_id {
            return Some(id.to_string());
        }
        self.payment()
            .map(|payment| format!("{}:{}", self.event, payment.id))
    }
}

pub(super) fn parse(payload: &[u8], header_event_id: Option<&str>) -> Result<ProviderEvent, BillingError> {
    let raw: Value = serde_json::from_slice(payload)
        .map_err(|e| parse_error(PaymentProviderKind::Razorpay, e))?;
    let event: RazorpayEvent = serde_json::from_value(raw.clone())
        .map_err(|e| parse_error(PaymentProviderKind::Razorpay, e))?;

    let event_id = header_event_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| event.derived_event_id())
        .ok_or_else(|| parse_error(PaymentProviderKind::Razorpay, "missing event id"))?;

    Ok(ProviderEvent {
        provider: PaymentProviderKind::Razorpay,
        kind: event.kind(),
        event_id,
        event_type: event.event,
        payload: raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SubscriptionId;
    use serde_json::json;

    fn body(event: &str, payment: Value) -> Vec<u8> {
        json!({
            "entity": "event",
            "event": event,
            "payload": {"payment": {"entity": payment}},
            "created_at": 1_700_000_000
        })
        .to_string()
        .into_bytes()
    }

    fn notes(sub: SubscriptionId) -> Value {
        json!({"subscriptionId": sub.to_string(), "transactionId": "T1abc", "planName": "Premium"})
    }

    #[test]
    fn captured_payment_carries_payment_and_order_ids() {
        let sub = SubscriptionId::new();
        let payload = body(
            "payment.captured",
            json!({"id": "pay_1", "order_id": "order_1", "notes": notes(sub)}),
        );

        let parsed = parse(&payload, Some("evt_rzp_1")).unwrap();

        assert_eq!(parsed.event_id, "evt_rzp_1");
        match parsed.kind {
            EventKind::PaymentSucceeded { correlation, proof } => {
                assert_eq!(correlation.subscription_id, sub);
                assert_eq!(proof.razorpay_payment_id.as_deref(), Some("pay_1"));
                assert_eq!(proof.razorpay_order_id.as_deref(), Some("order_1"));
            }
            other => panic!("expected PaymentSucceeded, got {:?}", other),
        }
    }

    #[test]
    fn event_id_falls_back_to_event_and_payment() {
        let payload = body("payment.captured", json!({"id": "pay_1", "notes": []}));
        let parsed = parse(&payload, None).unwrap();
        assert_eq!(parsed.event_id, "payment.captured:pay_1");
    }

    #[test]
    fn body_id_is_used_before_derived_id() {
        let payload = json!({
            "id": "evt_body_7",
            "event": "payment.captured",
            "payload": {"payment": {"entity": {"id": "pay_1", "notes": []}}}
        })
        .to_string();
        let parsed = parse(payload.as_bytes(), None).unwrap();
        assert_eq!(parsed.event_id, "evt_body_7");
    }

    #[test]
    fn empty_notes_array_is_unactionable() {
        let payload = body("payment.captured", json!({"id": "pay_1", "notes": []}));
        assert!(matches!(parse(&payload, None).unwrap().kind, EventKind::Unactionable(_)));
    }

    #[test]
    fn failed_payment_uses_error_description() {
        let payload = body(
            "payment.failed",
            json!({"id": "pay_2", "notes": notes(SubscriptionId::new()), "error_description": "Card declined"}),
        );
        assert!(matches!(
            parse(&payload, None).unwrap().kind,
            EventKind::PaymentFailed { ref reason, .. } if reason == "Card declined"
        ));
    }

    #[test]
    fn failed_payment_without_description_uses_default_reason() {
        let payload = body("payment.failed", json!({"id": "pay_2", "notes": notes(SubscriptionId::new())}));
        assert!(matches!(
            parse(&payload, None).unwrap().kind,
            EventKind::PaymentFailed { ref reason, .. } if reason == RAZORPAY_FAILURE_REASON
        ));
    }

    #[test]
    fn order_paid_is_ignored() {
        let payload = body("order.paid", json!({"id": "pay_3", "notes": notes(SubscriptionId::new())}));
        assert_eq!(parse(&payload, Some("evt_2")).unwrap().kind, EventKind::Ignored);
    }

    #[test]
    fn event_without_payment_or_header_id_is_rejected() {
        let payload = json!({"event": "refund.created", "payload": {}}).to_string();
        assert!(parse(payload.as_bytes(), None).is_err());
    }
}
