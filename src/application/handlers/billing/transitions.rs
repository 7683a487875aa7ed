//! SubscriptionTransitions - the single entry point for activate and fail.
//!
//! Webhooks and client-side verification both route through here; nothing
//! else writes subscription, transaction or entitlement state.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::billing::{BillingError, Correlation, PaymentProof, TransitionOutcome};
use crate::ports::SubscriptionLedger;

/// Runs activation and failure against the ledger with logging.
pub struct SubscriptionTransitions {
    ledger: Arc<dyn SubscriptionLedger>,
}

impl SubscriptionTransitions {
    pub fn new(ledger: Arc<dyn SubscriptionLedger>) -> Self {
        Self { ledger }
    }

    /// Activates the subscription and entitles its user.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` when the pair does not exist; treat as alerting
    /// - `Conflict` when the user is already entitled elsewhere; needs manual reconciliation
    pub async fn activate(
        &self,
        correlation: &Correlation,
        proof: &PaymentProof,
    ) -> Result<TransitionOutcome, BillingError> {
        let result = self
            .ledger
            .activate(&correlation.subscription_id, &correlation.transaction_id, proof)
            .await
            .map_err(BillingError::from);

        match &result {
            Ok(TransitionOutcome::Applied) => info!(
                subscription_id = %correlation.subscription_id,
                transaction_id = %correlation.transaction_id,
                provider = %proof.provider(),
                "Subscription activated"
            ),
            Ok(outcome) => debug!(
                subscription_id = %correlation.subscription_id,
                ?outcome,
                "Activation already applied"
            ),
            Err(BillingError::Conflict(message)) => error!(
                subscription_id = %correlation.subscription_id,
                transaction_id = %correlation.transaction_id,
                payment_id = proof.payment_id().unwrap_or("unknown"),
                %message,
                "Paid subscription could not be activated; manual reconciliation required"
            ),
            Err(e) => error!(
                subscription_id = %correlation.subscription_id,
                transaction_id = %correlation.transaction_id,
                error = %e,
                "Activation failed"
            ),
        }
        result
    }

    /// Cancels the subscription and fails its transaction.
    pub async fn fail(
        &self,
        correlation: &Correlation,
        reason: &str,
    ) -> Result<TransitionOutcome, BillingError> {
        let result = self
            .ledger
            .fail(&correlation.subscription_id, &correlation.transaction_id, reason)
            .await
            .map_err(BillingError::from);

        match &result {
            Ok(TransitionOutcome::Applied) => info!(
                subscription_id = %correlation.subscription_id,
                transaction_id = %correlation.transaction_id,
                reason,
                "Subscription marked failed"
            ),
            Ok(TransitionOutcome::AlreadyApplied) => debug!(
                subscription_id = %correlation.subscription_id,
                "Failure already applied"
            ),
            Ok(TransitionOutcome::Ignored) => warn!(
                subscription_id = %correlation.subscription_id,
                reason,
                "Ignoring failure for a subscription that is no longer pending"
            ),
            Err(e) => error!(
                subscription_id = %correlation.subscription_id,
                transaction_id = %correlation.transaction_id,
                error = %e,
                "Failure transition failed"
            ),
        }
        result
    }
}
