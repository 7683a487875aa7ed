//! VerifyRazorpayPaymentHandler - confirms a browser-reported Razorpay payment.
//!
//! The browser receives `{order_id, payment_id, signature}` when checkout
//! completes. The signature is HMAC-SHA256 over `"{order_id}|{payment_id}"`
//! keyed with the API key secret. A mismatch fails the subscription, since
//! the checkout page is waiting on this answer. So does a valid signature for
//! an order other than the one opened for the transaction.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::{info, warn};

use super::SubscriptionTransitions;
use crate::application::SettingsResolver;
use crate::domain::billing::webhook_verifier::verify_razorpay_payment_signature;
use crate::domain::billing::{BillingError, Correlation, PaymentProof, TransitionOutcome};
use crate::domain::foundation::UserId;
use crate::ports::BillingReader;

/// Failure reason recorded when the client signature does not verify.
pub const INVALID_RAZORPAY_SIGNATURE: &str = "Invalid Razorpay signature";

/// Command to verify a client-side Razorpay payment.
#[derive(Debug, Clone)]
pub struct VerifyRazorpayPaymentCommand {
    pub user_id: UserId,
    pub correlation: Correlation,
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Handler for the Razorpay verify call.
pub struct VerifyRazorpayPaymentHandler {
    reader: Arc<dyn BillingReader>,
    settings: Arc<SettingsResolver>,
    transitions: Arc<SubscriptionTransitions>,
}

impl VerifyRazorpayPaymentHandler {
    pub fn new(
        reader: Arc<dyn BillingReader>,
        settings: Arc<SettingsResolver>,
        transitions: Arc<SubscriptionTransitions>,
    ) -> Self {
        Self {
            reader,
            settings,
            transitions,
        }
    }

    /// # Errors
    ///
    /// - `InvalidRequest` when order or payment id is blank
    /// - `ProviderNotConfigured` when no key secret is set
    /// - `SubscriptionNotFound` when the caller does not own the subscription; nothing is written
    /// - `InvalidSignature` on mismatch or a foreign order, after the subscription was failed
    /// - whatever activation returns otherwise
    pub async fn handle(
        &self,
        cmd: VerifyRazorpayPaymentCommand,
    ) -> Result<TransitionOutcome, BillingError> {
        if cmd.order_id.trim().is_empty() || cmd.payment_id.trim().is_empty() {
            return Err(BillingError::invalid_request("Invalid verification payload"));
        }

        let settings = self.settings.resolve().await?;
        let key_secret = settings.razorpay_key_secret()?;

        let owner = self
            .reader
            .subscription_owner(&cmd.correlation.subscription_id)
            .await?;
        if owner.as_ref() != Some(&cmd.user_id) {
            warn!(
                user_id = %cmd.user_id,
                subscription_id = %cmd.correlation.subscription_id,
                "Razorpay verification for a subscription the caller does not own"
            );
            return Err(BillingError::subscription_not_found(format!(
                "subscription {}",
                cmd.correlation.subscription_id
            )));
        }

        if let Err(e) = verify_razorpay_payment_signature(
            key_secret.expose_secret(),
            &cmd.order_id,
            &cmd.payment_id,
            &cmd.signature,
        ) {
            warn!(
                user_id = %cmd.user_id,
                subscription_id = %cmd.correlation.subscription_id,
                order_id = %cmd.order_id,
                error = %e,
                "Razorpay payment signature rejected"
            );
            self.transitions
                .fail(&cmd.correlation, INVALID_RAZORPAY_SIGNATURE)
                .await?;
            return Err(BillingError::invalid_signature(e.to_string()));
        }

        let proof = PaymentProof::razorpay(cmd.payment_id, Some(cmd.order_id));
        let outcome = match self.transitions.activate(&cmd.correlation, &proof).await {
            Err(BillingError::InvalidSignature(reason)) => {
                self.transitions
                    .fail(&cmd.correlation, INVALID_RAZORPAY_SIGNATURE)
                    .await?;
                return Err(BillingError::InvalidSignature(reason));
            }
            result => result?,
        };
        info!(
            user_id = %cmd.user_id,
            subscription_id = %cmd.correlation.subscription_id,
            ?outcome,
            "Razorpay payment verified"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, InMemorySettingsStore};
    use crate::config::PaymentConfig;
    use crate::domain::billing::webhook_verifier::sign_razorpay_payment;
    use crate::domain::billing::{
        BillingInterval, PaymentProviderKind, PaymentTransaction, Subscription, SubscriptionStatus,
        TransactionStatus,
    };
    use crate::domain::foundation::{PlanId, Timestamp};
    use crate::ports::{BillingReader, SettingKey, SubscriptionLedger};
    use serde_json::json;

    const KEY_SECRET: &str = "rzp_key_secret";

    async fn handler_with(store: &InMemoryBillingStore, key_secret: Option<&str>) -> VerifyRazorpayPaymentHandler {
        let settings = InMemorySettingsStore::new();
        if let Some(secret) = key_secret {
            settings.set(SettingKey::RazorpayKeySecret, json!(secret)).await;
        }
        VerifyRazorpayPaymentHandler::new(
            Arc::new(store.clone()),
            Arc::new(SettingsResolver::new(Arc::new(settings), PaymentConfig::default())),
            Arc::new(SubscriptionTransitions::new(Arc::new(store.clone()))),
        )
    }

    async fn open(store: &InMemoryBillingStore) -> Correlation {
        let now = Timestamp::now();
        let user = UserId::new("user-1").unwrap();
        let sub = Subscription::open_pending(user.clone(), PlanId::new(), BillingInterval::Yearly, now);
        let txn = PaymentTransaction::open(
            user,
            sub.id,
            PaymentProviderKind::Razorpay,
            4999,
            "INR",
            None,
            now,
        );
        let correlation = Correlation {
            subscription_id: sub.id,
            transaction_id: txn.id.clone(),
        };
        store.open_checkout(sub, txn).await.unwrap();
        correlation
    }

    fn command(correlation: Correlation, signature: String) -> VerifyRazorpayPaymentCommand {
        VerifyRazorpayPaymentCommand {
            user_id: UserId::new("user-1").unwrap(),
            correlation,
            order_id: "order_1".to_string(),
            payment_id: "pay_1".to_string(),
            signature,
        }
    }

    #[tokio::test]
    async fn valid_signature_activates() {
        let store = InMemoryBillingStore::new();
        let correlation = open(&store).await;
        let handler = handler_with(&store, Some(KEY_SECRET)).await;

        let outcome = handler
            .handle(command(
                correlation.clone(),
                sign_razorpay_payment(KEY_SECRET, "order_1", "pay_1"),
            ))
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::Applied);
        let sub = store.subscription(&correlation.subscription_id).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        let txn = store.transaction(&correlation.transaction_id).await.unwrap();
        assert_eq!(txn.status, TransactionStatus::Paid);
        assert_eq!(txn.proof.razorpay_order_id.as_deref(), Some("order_1"));
    }

    #[tokio::test]
    async fn mismatch_fails_subscription_and_errors() {
        let store = InMemoryBillingStore::new();
        let correlation = open(&store).await;
        let handler = handler_with(&store, Some(KEY_SECRET)).await;

        let err = handler
            .handle(command(
                correlation.clone(),
                sign_razorpay_payment("wrong", "order_1", "pay_1"),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidSignature(_)));
        let sub = store.subscription(&correlation.subscription_id).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert_eq!(sub.cancellation_reason.as_deref(), Some(INVALID_RAZORPAY_SIGNATURE));
    }

    #[tokio::test]
    async fn foreign_order_signature_fails_without_activating() {
        let store = InMemoryBillingStore::new();
        let correlation = open(&store).await;
        store
            .attach_order_id(&correlation.transaction_id, "order_B")
            .await
            .unwrap();
        let handler = handler_with(&store, Some(KEY_SECRET)).await;

        // Valid signature, but for an order paid under another checkout
        let err = handler
            .handle(command(
                correlation.clone(),
                sign_razorpay_payment(KEY_SECRET, "order_1", "pay_1"),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidSignature(_)));
        let sub = store.subscription(&correlation.subscription_id).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        let txn = store.transaction(&correlation.transaction_id).await.unwrap();
        assert_eq!(txn.status, TransactionStatus::Failed);
        assert_eq!(txn.proof.razorpay_order_id.as_deref(), Some("order_B"));
        assert!(txn.proof.razorpay_payment_id.is_none());
        let user = UserId::new("user-1").unwrap();
        assert!(!store.entitlement(&user).await.unwrap().unwrap_or_default().is_paid_user);
    }

    #[tokio::test]
    async fn matching_order_signature_activates() {
        let store = InMemoryBillingStore::new();
        let correlation = open(&store).await;
        store
            .attach_order_id(&correlation.transaction_id, "order_1")
            .await
            .unwrap();
        let handler = handler_with(&store, Some(KEY_SECRET)).await;

        let outcome = handler
            .handle(command(
                correlation.clone(),
                sign_razorpay_payment(KEY_SECRET, "order_1", "pay_1"),
            ))
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::Applied);
    }

    #[tokio::test]
    async fn caller_who_does_not_own_subscription_changes_nothing() {
        let store = InMemoryBillingStore::new();
        let correlation = open(&store).await;
        let handler = handler_with(&store, Some(KEY_SECRET)).await;
        let mut cmd = command(
            correlation.clone(),
            sign_razorpay_payment(KEY_SECRET, "order_1", "pay_1"),
        );
        cmd.user_id = UserId::new("someone-else").unwrap();

        let err = handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, BillingError::SubscriptionNotFound(_)));
        assert_eq!(
            store.subscription(&correlation.subscription_id).await.unwrap().status,
            SubscriptionStatus::Pending
        );
    }

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let store = InMemoryBillingStore::new();
        let mut correlation = open(&store).await;
        correlation.subscription_id = crate::domain::foundation::SubscriptionId::new();
        let handler = handler_with(&store, Some(KEY_SECRET)).await;

        let err = handler
            .handle(command(
                correlation,
                sign_razorpay_payment(KEY_SECRET, "order_1", "pay_1"),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::SubscriptionNotFound(_)));
    }

    #[tokio::test]
    async fn missing_key_secret_writes_nothing() {
        let store = InMemoryBillingStore::new();
        let correlation = open(&store).await;
        let handler = handler_with(&store, None).await;

        let err = handler
            .handle(command(correlation.clone(), "abc".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::ProviderNotConfigured { .. }));
        assert_eq!(
            store.subscription(&correlation.subscription_id).await.unwrap().status,
            SubscriptionStatus::Pending
        );
    }

    #[tokio::test]
    async fn blank_ids_are_invalid_request() {
        let store = InMemoryBillingStore::new();
        let correlation = open(&store).await;
        let handler = handler_with(&store, Some(KEY_SECRET)).await;
        let mut cmd = command(correlation, String::new());
        cmd.payment_id = " ".to_string();

        assert!(matches!(
            handler.handle(cmd).await,
            Err(BillingError::InvalidRequest(_))
        ));
    }
}
