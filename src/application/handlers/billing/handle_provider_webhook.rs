//! HandleProviderWebhookHandler - verifies, logs and applies provider webhooks.
//!
//! ```text
//! received -> signature-verified -> event-logged -> transition -> acknowledged
//! received -> signature-rejected -> error (nothing written)
//! ```
//!
//! Once the signature passes, the provider always gets an acknowledgement.
//! Transition failures are recorded on the logged event for manual
//! reconciliation instead of making the provider retry forever.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::{error, info, warn};

use super::SubscriptionTransitions;
use crate::application::SettingsResolver;
use crate::domain::billing::{
    BillingError, EventKind, PaymentProviderKind, ProviderEvent, TransitionOutcome,
    WebhookDelivery,
};
use crate::domain::foundation::Timestamp;
use crate::ports::WebhookEventLog;

/// Command carrying an inbound webhook exactly as received.
#[derive(Debug, Clone)]
pub struct HandleProviderWebhookCommand {
    pub provider: PaymentProviderKind,
    /// Raw request body; the signature covers these bytes.
    pub payload: Vec<u8>,
    pub signature: Option<String>,
    /// Event id from a transport header, when the provider sends one.
    pub event_id: Option<String>,
}

/// What happened to an acknowledged webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleProviderWebhookResult {
    /// The event's transition ran.
    Applied {
        event_id: String,
        outcome: TransitionOutcome,
    },
    /// Already fully processed by an earlier delivery.
    Duplicate { event_id: String },
    /// Logged for audit; no transition for this event.
    Ignored { event_id: String },
    /// Logged, but the transition could not run; see the event's error.
    Failed { event_id: String, error: String },
}

/// Handler for provider webhooks.
pub struct HandleProviderWebhookHandler {
    settings: Arc<SettingsResolver>,
    event_log: Arc<dyn WebhookEventLog>,
    transitions: Arc<SubscriptionTransitions>,
}

impl HandleProviderWebhookHandler {
    pub fn new(
        settings: Arc<SettingsResolver>,
        event_log: Arc<dyn WebhookEventLog>,
        transitions: Arc<SubscriptionTransitions>,
    ) -> Self {
        Self {
            settings,
            event_log,
            transitions,
        }
    }

    /// # Errors
    ///
    /// - `WebhookNotConfigured` when no signing secret is set
    /// - `InvalidSignature` when the signature is missing or wrong
    /// - `InvalidRequest` when a signed body cannot be parsed
    /// - `Infrastructure` when the event cannot be logged (provider should retry)
    pub async fn handle(
        &self,
        cmd: HandleProviderWebhookCommand,
    ) -> Result<HandleProviderWebhookResult, BillingError> {
        // 1. Verify before anything is written
        let settings = self.settings.resolve().await?;
        let secret = settings.webhook_secret(cmd.provider)?;
        let delivery = WebhookDelivery {
            payload: &cmd.payload,
            signature: cmd.signature.as_deref(),
            event_id: cmd.event_id.as_deref(),
        };
        let event = ProviderEvent::verify_and_parse(
            cmd.provider,
            &delivery,
            secret.expose_secret(),
            Timestamp::now(),
        )
        .map_err(|e| {
            warn!(provider = %cmd.provider, error = %e, "Rejected webhook");
            e
        })?;

        // 2. Log once; skip what an earlier delivery already finished
        let recorded = self.event_log.record_once(&event).await?;
        if !recorded.should_process() {
            info!(
                provider = %event.provider,
                event_id = %event.event_id,
                "Duplicate webhook delivery"
            );
            return Ok(HandleProviderWebhookResult::Duplicate {
                event_id: event.event_id,
            });
        }

        // 3. Apply
        let applied = match &event.kind {
            EventKind::PaymentSucceeded { correlation, proof } => {
                self.transitions.activate(correlation, proof).await.map(Some)
            }
            EventKind::PaymentFailed { correlation, reason } => {
                self.transitions.fail(correlation, reason).await.map(Some)
            }
            EventKind::Unactionable(why) => Err(BillingError::invalid_request(format!(
                "{} cannot be applied: {}",
                event.event_type, why
            ))),
            EventKind::Ignored => Ok(None),
        };

        // 4. Record the result on the logged event
        match applied {
            Ok(outcome) => {
                self.event_log
                    .mark_processed(event.provider, &event.event_id)
                    .await?;
                Ok(match outcome {
                    Some(outcome) => HandleProviderWebhookResult::Applied {
                        event_id: event.event_id,
                        outcome,
                    },
                    None => HandleProviderWebhookResult::Ignored {
                        event_id: event.event_id,
                    },
                })
            }
            Err(e) => {
                let message = e.to_string();
                error!(
                    provider = %event.provider,
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    error = %message,
                    "Webhook handler error"
                );
                if let Err(log_err) = self
                    .event_log
                    .mark_failed(event.provider, &event.event_id, &message)
                    .await
                {
                    error!(event_id = %event.event_id, error = %log_err, "Could not record webhook error");
                }
                Ok(HandleProviderWebhookResult::Failed {
                    event_id: event.event_id,
                    error: message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{FaultPoint, InMemoryBillingStore, InMemorySettingsStore};
    use crate::config::PaymentConfig;
    use crate::domain::billing::webhook_verifier::{sign_razorpay_payload, sign_stripe_payload};
    use crate::domain::billing::{
        BillingInterval, PaymentTransaction, Subscription, SubscriptionStatus,
    };
    use crate::domain::foundation::{PlanId, SubscriptionId, TransactionId, UserId};
    use crate::ports::{BillingReader, SettingKey, SubscriptionLedger};
    use serde_json::json;

    const STRIPE_SECRET: &str = "whsec_test";
    const RAZORPAY_SECRET: &str = "rzp_whsec";

    struct Fixture {
        store: InMemoryBillingStore,
        handler: HandleProviderWebhookHandler,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryBillingStore::new();
        let settings = InMemorySettingsStore::new();
        settings
            .set(SettingKey::StripeWebhookSecret, json!(STRIPE_SECRET))
            .await;
        settings
            .set(SettingKey::RazorpayWebhookSecret, json!(RAZORPAY_SECRET))
            .await;
        let handler = HandleProviderWebhookHandler::new(
            Arc::new(SettingsResolver::new(
                Arc::new(settings),
                PaymentConfig::default(),
            )),
            Arc::new(store.clone()),
            Arc::new(SubscriptionTransitions::new(Arc::new(store.clone()))),
        );
        Fixture { store, handler }
    }

    async fn open(store: &InMemoryBillingStore) -> (SubscriptionId, TransactionId) {
        let now = Timestamp::now();
        let user = UserId::new("user-1").unwrap();
        let sub = Subscription::open_pending(user.clone(), PlanId::new(), BillingInterval::Monthly, now);
        let txn = PaymentTransaction::open(
            user,
            sub.id,
            PaymentProviderKind::Stripe,
            500,
            "INR",
            None,
            now,
        );
        let ids = (sub.id, txn.id.clone());
        store.open_checkout(sub, txn).await.unwrap();
        ids
    }

    fn stripe_command(event_type: &str, sub: SubscriptionId, txn: &TransactionId) -> HandleProviderWebhookCommand {
        let payload = json!({
            "id": "evt_123",
            "type": event_type,
            "created": 1_700_000_000,
            "livemode": false,
            "data": {"object": {
                "id": "cs_test_1",
                "payment_status": "paid",
                "payment_intent": "pi_1",
                "metadata": {"subscriptionId": sub.to_string(), "transactionId": txn.as_str()}
            }}
        })
        .to_string()
        .into_bytes();
        let signature = sign_stripe_payload(STRIPE_SECRET, Timestamp::now().as_unix_secs(), &payload);
        HandleProviderWebhookCommand {
            provider: PaymentProviderKind::Stripe,
            payload,
            signature: Some(signature),
            event_id: None,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Verification
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn bad_signature_writes_nothing() {
        let f = fixture().await;
        let (sub, txn) = open(&f.store).await;
        let mut cmd = stripe_command("checkout.session.completed", sub, &txn);
        cmd.signature = Some(sign_stripe_payload("whsec_other", Timestamp::now().as_unix_secs(), &cmd.payload));

        let err = f.handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, BillingError::InvalidSignature(_)));
        assert_eq!(f.store.webhook_event_count().await, 0);
        assert_eq!(
            f.store.subscription(&sub).await.unwrap().status,
            SubscriptionStatus::Pending
        );
    }

    #[tokio::test]
    async fn missing_signature_header_is_rejected() {
        let f = fixture().await;
        let (sub, txn) = open(&f.store).await;
        let mut cmd = stripe_command("checkout.session.completed", sub, &txn);
        cmd.signature = None;

        assert!(matches!(
            f.handler.handle(cmd).await,
            Err(BillingError::InvalidSignature(_))
        ));
    }

    #[tokio::test]
    async fn unconfigured_secret_is_distinct_error() {
        let store = InMemoryBillingStore::new();
        let handler = HandleProviderWebhookHandler::new(
            Arc::new(SettingsResolver::new(
                Arc::new(InMemorySettingsStore::new()),
                PaymentConfig::default(),
            )),
            Arc::new(store.clone()),
            Arc::new(SubscriptionTransitions::new(Arc::new(store))),
        );
        let cmd = HandleProviderWebhookCommand {
            provider: PaymentProviderKind::Razorpay,
            payload: b"{}".to_vec(),
            signature: Some("abc".to_string()),
            event_id: None,
        };

        assert!(matches!(
            handler.handle(cmd).await,
            Err(BillingError::WebhookNotConfigured(PaymentProviderKind::Razorpay))
        ));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Application and idempotency
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn completed_checkout_activates_once() {
        let f = fixture().await;
        let (sub, txn) = open(&f.store).await;

        let first = f
            .handler
            .handle(stripe_command("checkout.session.completed", sub, &txn))
            .await
            .unwrap();
        let period_end = f.store.subscription(&sub).await.unwrap().current_period_end;
        let second = f
            .handler
            .handle(stripe_command("checkout.session.completed", sub, &txn))
            .await
            .unwrap();

        assert_eq!(
            first,
            HandleProviderWebhookResult::Applied {
                event_id: "evt_123".to_string(),
                outcome: TransitionOutcome::Applied
            }
        );
        assert_eq!(
            second,
            HandleProviderWebhookResult::Duplicate {
                event_id: "evt_123".to_string()
            }
        );
        assert_eq!(f.store.webhook_event_count().await, 1);
        assert_eq!(
            f.store.subscription(&sub).await.unwrap().current_period_end,
            period_end
        );
    }

    #[tokio::test]
    async fn crashed_transition_is_retried_on_redelivery() {
        let f = fixture().await;
        let (sub, txn) = open(&f.store).await;
        f.store.fail_once(FaultPoint::BeforeEntitlementWrite).await;

        let first = f
            .handler
            .handle(stripe_command("checkout.session.completed", sub, &txn))
            .await
            .unwrap();
        assert!(matches!(first, HandleProviderWebhookResult::Failed { .. }));
        let logged = f
            .store
            .find(PaymentProviderKind::Stripe, "evt_123")
            .await
            .unwrap()
            .unwrap();
        assert!(!logged.processed);
        assert!(logged.error.is_some());

        let second = f
            .handler
            .handle(stripe_command("checkout.session.completed", sub, &txn))
            .await
            .unwrap();
        assert!(matches!(second, HandleProviderWebhookResult::Applied { .. }));
        assert_eq!(
            f.store.subscription(&sub).await.unwrap().status,
            SubscriptionStatus::Active
        );
    }

    #[tokio::test]
    async fn expired_session_fails_subscription() {
        let f = fixture().await;
        let (sub, txn) = open(&f.store).await;

        f.handler
            .handle(stripe_command("checkout.session.expired", sub, &txn))
            .await
            .unwrap();

        let cancelled = f.store.subscription(&sub).await.unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert_eq!(
            cancelled.cancellation_reason.as_deref(),
            Some("Stripe payment failed")
        );
    }

    #[tokio::test]
    async fn uninteresting_event_is_logged_and_acknowledged() {
        let f = fixture().await;
        let (sub, txn) = open(&f.store).await;

        let result = f
            .handler
            .handle(stripe_command("customer.created", sub, &txn))
            .await
            .unwrap();

        assert!(matches!(result, HandleProviderWebhookResult::Ignored { .. }));
        assert_eq!(f.store.webhook_event_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_subscription_is_acknowledged_but_recorded() {
        let f = fixture().await;
        let result = f
            .handler
            .handle(stripe_command(
                "checkout.session.completed",
                SubscriptionId::new(),
                &TransactionId::generate(),
            ))
            .await
            .unwrap();

        assert!(matches!(result, HandleProviderWebhookResult::Failed { .. }));
    }

    #[tokio::test]
    async fn razorpay_capture_activates_with_payment_id() {
        let f = fixture().await;
        let (sub, txn) = open(&f.store).await;
        let payload = json!({
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": "pay_9",
                "order_id": "order_9",
                "notes": {"subscriptionId": sub.to_string(), "transactionId": txn.as_str()}
            }}}
        })
        .to_string()
        .into_bytes();
        let cmd = HandleProviderWebhookCommand {
            provider: PaymentProviderKind::Razorpay,
            signature: Some(sign_razorpay_payload(RAZORPAY_SECRET, &payload)),
            payload,
            event_id: Some("evt_rzp_1".to_string()),
        };

        f.handler.handle(cmd).await.unwrap();

        let paid = f.store.transaction(&txn).await.unwrap();
        assert_eq!(paid.proof.razorpay_payment_id.as_deref(), Some("pay_9"));
        let entitlement = f
            .store
            .entitlement(&UserId::new("user-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entitlement.payment_provider, Some(PaymentProviderKind::Razorpay));
    }
}
