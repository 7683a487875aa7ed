//! SubscriptionLedger port - the only write path for subscription state.
//!
//! Every method is one storage transaction. Implementations must never let
//! a partial result be observed: a subscription active without its user
//! entitled, or a transaction paid against a cancelled subscription.

use async_trait::async_trait;

use crate::domain::billing::{PaymentProof, PaymentTransaction, Subscription, TransitionOutcome};
use crate::domain::foundation::{DomainError, SubscriptionId, TransactionId};

/// Result of opening a checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOpened {
    pub subscription: Subscription,
    pub transaction: PaymentTransaction,
    /// Stale pending subscriptions cancelled before opening this one.
    pub reconciled: u64,
}

/// Write access to subscriptions, transactions and user entitlement.
#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    /// Reconciles, guards and inserts a new checkout attempt atomically.
    ///
    /// In one transaction, serialized per user:
    /// 1. cancel every `pending` subscription of the user
    /// 2. refuse if any subscription is entitling
    /// 3. insert the pending subscription and its transaction
    ///
    /// # Errors
    ///
    /// - `ErrorCode::AlreadySubscribed` if step 2 refuses; nothing is written
    async fn open_checkout(
        &self,
        subscription: Subscription,
        transaction: PaymentTransaction,
    ) -> Result<CheckoutOpened, DomainError>;

    /// Stores the provider order id on a pending transaction.
    async fn attach_order_id(
        &self,
        transaction_id: &TransactionId,
        order_id: &str,
    ) -> Result<(), DomainError>;

    /// Activates the subscription, pays the transaction and entitles the user.
    ///
    /// # Errors
    ///
    /// - `ErrorCode::SubscriptionNotFound` if either row is missing or they do not pair
    /// - `ErrorCode::Conflict` if the user already holds another entitling subscription
    async fn activate(
        &self,
        subscription_id: &SubscriptionId,
        transaction_id: &TransactionId,
        proof: &PaymentProof,
    ) -> Result<TransitionOutcome, DomainError>;

    /// Cancels the subscription and fails the transaction.
    ///
    /// # Errors
    ///
    /// - `ErrorCode::SubscriptionNotFound` if either row is missing or they do not pair
    async fn fail(
        &self,
        subscription_id: &SubscriptionId,
        transaction_id: &TransactionId,
        reason: &str,
    ) -> Result<TransitionOutcome, DomainError>;
}
