//! Payment transaction entity.
//!
//! Created 1:1 with the subscription it pays for and settled exactly once
//! alongside it.

use serde::{Deserialize, Serialize};

use super::{BillingError, PaymentProof, PaymentProviderKind, TransactionStatus};
use crate::domain::foundation::{
    StateMachine, SubscriptionId, Timestamp, TransactionId, UserId,
};

/// One attempted payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
    pub provider: PaymentProviderKind,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub description: Option<String>,
    /// Correlation ids recorded so far (order id at checkout, the rest on payment).
    pub proof: PaymentProof,
    pub failure_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PaymentTransaction {
    /// Opens a pending transaction with a freshly generated reference.
    pub fn open(
        user_id: UserId,
        subscription_id: SubscriptionId,
        provider: PaymentProviderKind,
        amount: i64,
        currency: impl Into<String>,
        description: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            subscription_id,
            provider,
            amount,
            currency: currency.into(),
            status: TransactionStatus::Pending,
            description,
            proof: PaymentProof::default(),
            failure_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when this transaction was opened for `subscription_id`.
    pub fn belongs_to(&self, subscription_id: &SubscriptionId) -> bool {
        &self.subscription_id == subscription_id
    }

    /// Records the provider order created for this transaction.
    pub fn attach_order_id(&mut self, order_id: impl Into<String>, now: Timestamp) {
        self.proof.razorpay_order_id = Some(order_id.into());
        self.updated_at = now;
    }

    /// Refuses a payment made against a different provider order.
    ///
    /// Only applies once an order id was recorded at checkout and the proof
    /// names one.
    pub fn ensure_order(&self, proof: &PaymentProof) -> Result<(), BillingError> {
        match (&self.proof.razorpay_order_id, &proof.razorpay_order_id) {
            (Some(expected), Some(paid)) if expected != paid => {
                Err(BillingError::invalid_signature(format!(
                    "payment order {} does not match order {} of transaction {}",
                    paid, expected, self.id
                )))
            }
            _ => Ok(()),
        }
    }

    /// Settles the transaction as paid, merging the supplied correlation ids.
    pub fn mark_paid(&mut self, proof: &PaymentProof, now: Timestamp) {
        if self.status.can_transition_to(&TransactionStatus::Paid) {
            self.status = TransactionStatus::Paid;
        }
        merge(&mut self.proof.stripe_payment_intent_id, &proof.stripe_payment_intent_id);
        merge(&mut self.proof.stripe_charge_id, &proof.stripe_charge_id);
        merge(&mut self.proof.razorpay_payment_id, &proof.razorpay_payment_id);
        merge(&mut self.proof.razorpay_order_id, &proof.razorpay_order_id);
        merge(&mut self.proof.invoice_url, &proof.invoice_url);
        self.failure_message = None;
        self.updated_at = now;
    }

    /// Settles the transaction as failed.
    pub fn mark_failed(&mut self, reason: &str, now: Timestamp) {
        if self.status.can_transition_to(&TransactionStatus::Failed) {
            self.status = TransactionStatus::Failed;
            self.failure_message = Some(reason.to_string());
            self.updated_at = now;
        }
    }
}

fn merge(slot: &mut Option<String>, incoming: &Option<String>) {
    if let Some(value) = incoming {
        *slot = Some(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> PaymentTransaction {
        PaymentTransaction::open(
            UserId::new("user-1").unwrap(),
            SubscriptionId::new(),
            PaymentProviderKind::Razorpay,
            49_900,
            "INR",
            Some("Premium (monthly)".to_string()),
            Timestamp::now(),
        )
    }

    #[test]
    fn opens_pending_with_generated_reference() {
        let txn = open();
        assert_eq!(txn.status, TransactionStatus::Pending);
        assert_eq!(txn.id.as_str().len(), 24);
    }

    #[test]
    fn mark_paid_keeps_order_id_from_checkout() {
        let mut txn = open();
        txn.attach_order_id("order_1", Timestamp::now());

        txn.mark_paid(&PaymentProof::razorpay("pay_1", None), Timestamp::now());

        assert_eq!(txn.status, TransactionStatus::Paid);
        assert_eq!(txn.proof.razorpay_order_id.as_deref(), Some("order_1"));
        assert_eq!(txn.proof.razorpay_payment_id.as_deref(), Some("pay_1"));
    }

    #[test]
    fn ensure_order_refuses_a_foreign_order() {
        let mut txn = open();
        txn.attach_order_id("order_B", Timestamp::now());

        let err = txn
            .ensure_order(&PaymentProof::razorpay("pay_1", Some("order_A".to_string())))
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidSignature(_)));
    }

    #[test]
    fn ensure_order_accepts_matching_or_unrecorded_orders() {
        let mut txn = open();
        let proof = PaymentProof::razorpay("pay_1", Some("order_A".to_string()));
        assert!(txn.ensure_order(&proof).is_ok());

        txn.attach_order_id("order_A", Timestamp::now());
        assert!(txn.ensure_order(&proof).is_ok());
        assert!(txn.ensure_order(&PaymentProof::razorpay("pay_1", None)).is_ok());
    }

    #[test]
    fn mark_failed_records_reason() {
        let mut txn = open();
        txn.mark_failed("Invalid Razorpay signature", Timestamp::now());
        assert_eq!(txn.status, TransactionStatus::Failed);
        assert_eq!(txn.failure_message.as_deref(), Some("Invalid Razorpay signature"));
    }

    #[test]
    fn paid_transaction_is_not_failed_later() {
        let mut txn = open();
        txn.mark_paid(&PaymentProof::stripe(Some("pi_1".into())), Timestamp::now());
        txn.mark_failed("late", Timestamp::now());
        assert_eq!(txn.status, TransactionStatus::Paid);
        assert!(txn.failure_message.is_none());
    }

    #[test]
    fn failed_transaction_clears_message_when_paid() {
        let mut txn = open();
        txn.mark_failed("declined", Timestamp::now());
        txn.mark_paid(&PaymentProof::razorpay("pay_2", None), Timestamp::now());
        assert_eq!(txn.status, TransactionStatus::Paid);
        assert!(txn.failure_message.is_none());
    }
}
