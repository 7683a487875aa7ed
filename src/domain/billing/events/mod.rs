//! Provider-neutral webhook events.
//!
//! Each provider's wire format is parsed in its own submodule and reduced to
//! a [`ProviderEvent`]. [`ProviderEvent::verify_and_parse`] is the single
//! dispatch point: signature first, then parsing, per provider.

mod razorpay;
mod stripe;

pub use razorpay::{RazorpayEntity, RazorpayEvent, RazorpayPayload, RazorpayPayment, RAZORPAY_FAILURE_REASON};
pub use stripe::{StripeEvent, StripeEventData, STRIPE_FAILURE_REASON};

use serde_json::Value;

use super::webhook_verifier::{RazorpayWebhookVerifier, SignatureError, StripeWebhookVerifier};
use super::{BillingError, PaymentProof, PaymentProviderKind};
use crate::domain::foundation::{SubscriptionId, Timestamp, TransactionId};

/// Metadata keys written at checkout and echoed back by providers.
pub const SUBSCRIPTION_ID_KEY: &str = "subscriptionId";
pub const TRANSACTION_ID_KEY: &str = "transactionId";

/// Which subscription/transaction pair an event settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub subscription_id: SubscriptionId,
    pub transaction_id: TransactionId,
}

impl Correlation {
    /// Reads the pair from a provider metadata/notes object.
    ///
    /// Returns `None` unless both keys are present and well-formed.
    pub fn from_metadata(metadata: &Value) -> Option<Self> {
        let subscription_id = metadata
            .get(SUBSCRIPTION_ID_KEY)
            .and_then(Value::as_str)?
            .parse::<SubscriptionId>()
            .ok()?;
        let transaction_id = metadata
            .get(TRANSACTION_ID_KEY)
            .and_then(Value::as_str)
            .and_then(|raw| TransactionId::new(raw).ok())?;
        Some(Self {
            subscription_id,
            transaction_id,
        })
    }
}

/// What the engine should do with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Payment settled; run activation.
    PaymentSucceeded {
        correlation: Correlation,
        proof: PaymentProof,
    },
    /// Payment failed or checkout lapsed; run failure.
    PaymentFailed {
        correlation: Correlation,
        reason: String,
    },
    /// A type we act on, but this delivery cannot be acted on.
    Unactionable(String),
    /// A type we do not act on. Logged for audit only.
    Ignored,
}

/// A verified, normalized provider event.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEvent {
    pub provider: PaymentProviderKind,
    /// Provider-assigned id, unique per provider; the idempotency key.
    pub event_id: String,
    pub event_type: String,
    pub kind: EventKind,
    /// Full raw payload, retained in the event log.
    pub payload: Value,
}

/// An inbound webhook request as received.
#[derive(Debug, Clone, Copy)]
pub struct WebhookDelivery<'a> {
    /// Exact request bytes; signatures cover these.
    pub payload: &'a [u8],
    pub signature: Option<&'a str>,
    /// Event id from a transport header, for providers that send one.
    pub event_id: Option<&'a str>,
}

impl ProviderEvent {
    /// Verifies the delivery with `secret` and parses it.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` when the header is missing or does not verify
    /// - `InvalidRequest` when a correctly signed body is not a valid event
    pub fn verify_and_parse(
        provider: PaymentProviderKind,
        delivery: &WebhookDelivery<'_>,
        secret: &str,
        now: Timestamp,
    ) -> Result<Self, BillingError> {
        let signature = delivery
            .signature
            .ok_or_else(|| signature_error(SignatureError::MissingHeader))?;

        match provider {
            PaymentProviderKind::Stripe => {
                StripeWebhookVerifier::new(secret)
                    .verify(delivery.payload, signature, now)
                    .map_err(signature_error)?;
                stripe::parse(delivery.payload)
            }
            PaymentProviderKind::Razorpay => {
                RazorpayWebhookVerifier::new(secret)
                    .verify(delivery.payload, signature)
                    .map_err(signature_error)?;
                razorpay::parse(delivery.payload, delivery.event_id)
            }
        }
    }
}

fn signature_error(err: SignatureError) -> BillingError {
    BillingError::invalid_signature(err.to_string())
}

fn parse_error(provider: PaymentProviderKind, err: impl std::fmt::Display) -> BillingError {
    BillingError::invalid_request(format!(
        "Malformed {} webhook payload: {}",
        provider.display_name(),
        err
    ))
}
