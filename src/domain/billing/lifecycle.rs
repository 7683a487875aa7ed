//! Paired state transitions for a subscription and its transaction.
//!
//! Storage adapters load both rows (locked), run one of these, and persist
//! every row the result says changed inside the same storage transaction.

use super::{
    BillingError, Entitlement, PaymentProof, PaymentTransaction, Subscription, TransitionOutcome,
};
use crate::domain::foundation::Timestamp;

/// What an activation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub outcome: TransitionOutcome,
    /// New user entitlement, present only when the activation applied.
    pub entitlement: Option<Entitlement>,
}

/// Marks subscription active, transaction paid, and grants entitlement.
///
/// # Errors
///
/// - `SubscriptionNotFound` if the transaction was not opened for this subscription
/// - `InvalidSignature` if the proof names a different order than the transaction
/// - `Conflict` if the user already holds a different entitling subscription
/// - `InvalidState` if the subscription cannot become active
pub fn apply_activation(
    subscription: &mut Subscription,
    transaction: &mut PaymentTransaction,
    proof: &PaymentProof,
    holds_other_entitlement: bool,
    now: Timestamp,
) -> Result<Activation, BillingError> {
    ensure_pair(subscription, transaction)?;
    transaction.ensure_order(proof)?;

    let outcome = subscription.activate(now, holds_other_entitlement)?;
    if !outcome.is_applied() {
        return Ok(Activation {
            outcome,
            entitlement: None,
        });
    }

    transaction.mark_paid(proof, now);
    Ok(Activation {
        outcome,
        entitlement: Some(Entitlement::granted(proof, now)),
    })
}

/// Cancels the subscription and fails its transaction. Entitlement is never touched.
pub fn apply_failure(
    subscription: &mut Subscription,
    transaction: &mut PaymentTransaction,
    reason: &str,
    now: Timestamp,
) -> Result<TransitionOutcome, BillingError> {
    ensure_pair(subscription, transaction)?;

    let outcome = subscription.fail(reason, now);
    if outcome.is_applied() {
        transaction.mark_failed(reason, now);
    }
    Ok(outcome)
}

fn ensure_pair(
    subscription: &Subscription,
    transaction: &PaymentTransaction,
) -> Result<(), BillingError> {
    if !transaction.belongs_to(&subscription.id) || transaction.user_id != subscription.user_id {
        return Err(BillingError::subscription_not_found(format!(
            "transaction {} does not belong to subscription {}",
            transaction.id, subscription.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{
        BillingInterval, PaymentProviderKind, SubscriptionStatus, TransactionStatus,
    };
    use crate::domain::foundation::{PlanId, SubscriptionId, UserId};

    fn pair() -> (Subscription, PaymentTransaction) {
        let now = Timestamp::now();
        let user = UserId::new("user-7").unwrap();
        let sub = Subscription::open_pending(user.clone(), PlanId::new(), BillingInterval::Yearly, now);
        let txn = PaymentTransaction::open(
            user,
            sub.id,
            PaymentProviderKind::Stripe,
            6000,
            "INR",
            None,
            now,
        );
        (sub, txn)
    }

    #[test]
    fn activation_moves_all_three_together() {
        let (mut sub, mut txn) = pair();
        let proof = PaymentProof::stripe(Some("pi_42".to_string()));
        let now = Timestamp::now();

        let activation = apply_activation(&mut sub, &mut txn, &proof, false, now).unwrap();

        assert_eq!(activation.outcome, TransitionOutcome::Applied);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_end, Some(now.add_years(1)));
        assert_eq!(txn.status, TransactionStatus::Paid);
        assert_eq!(txn.proof.stripe_payment_intent_id.as_deref(), Some("pi_42"));
        let entitlement = activation.entitlement.unwrap();
        assert!(entitlement.is_paid_user);
        assert_eq!(entitlement.payment_id.as_deref(), Some("pi_42"));
    }

    #[test]
    fn repeated_activation_changes_nothing() {
        let (mut sub, mut txn) = pair();
        let proof = PaymentProof::stripe(Some("pi_42".to_string()));
        apply_activation(&mut sub, &mut txn, &proof, false, Timestamp::now()).unwrap();
        let (sub_before, txn_before) = (sub.clone(), txn.clone());

        let again = apply_activation(&mut sub, &mut txn, &proof, false, Timestamp::now()).unwrap();

        assert_eq!(again.outcome, TransitionOutcome::AlreadyApplied);
        assert!(again.entitlement.is_none());
        assert_eq!(sub, sub_before);
        assert_eq!(txn, txn_before);
    }

    #[test]
    fn mismatched_transaction_is_rejected() {
        let (mut sub, mut txn) = pair();
        txn.subscription_id = SubscriptionId::new();

        let result = apply_activation(&mut sub, &mut txn, &PaymentProof::default(), false, Timestamp::now());

        assert!(matches!(result, Err(BillingError::SubscriptionNotFound(_))));
        assert_eq!(sub.status, SubscriptionStatus::Pending);
    }

    #[test]
    fn activation_with_another_order_changes_nothing() {
        let (mut sub, mut txn) = pair();
        txn.attach_order_id("order_B", Timestamp::now());
        let (sub_before, txn_before) = (sub.clone(), txn.clone());
        let proof = PaymentProof::razorpay("pay_1", Some("order_A".to_string()));

        let result = apply_activation(&mut sub, &mut txn, &proof, false, Timestamp::now());

        assert!(matches!(result, Err(BillingError::InvalidSignature(_))));
        assert_eq!(sub, sub_before);
        assert_eq!(txn, txn_before);
        assert_eq!(txn.proof.razorpay_order_id.as_deref(), Some("order_B"));
    }

    #[test]
    fn failure_cancels_and_fails_transaction() {
        let (mut sub, mut txn) = pair();

        let outcome = apply_failure(&mut sub, &mut txn, "Stripe payment failed", Timestamp::now()).unwrap();

        assert_eq!(outcome, TransitionOutcome::Applied);
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert_eq!(txn.status, TransactionStatus::Failed);
        assert_eq!(txn.failure_message.as_deref(), Some("Stripe payment failed"));
    }

    #[test]
    fn failure_after_activation_leaves_paid_transaction() {
        let (mut sub, mut txn) = pair();
        apply_activation(&mut sub, &mut txn, &PaymentProof::stripe(None), false, Timestamp::now()).unwrap();

        let outcome = apply_failure(&mut sub, &mut txn, "expired", Timestamp::now()).unwrap();

        assert_eq!(outcome, TransitionOutcome::Ignored);
        assert_eq!(txn.status, TransactionStatus::Paid);
    }
}
