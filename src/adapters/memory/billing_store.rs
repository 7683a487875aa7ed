//! In-memory billing store.
//!
//! Implements the ledger, reader and event log ports over one lock. Every
//! write works on a clone of the state and swaps it in only when the whole
//! operation succeeds, so a failed operation leaves nothing behind, the same
//! as a rolled back database transaction.
//!
//! Faults can be injected at the points between row writes to prove that.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{
    apply_activation, apply_failure, Entitlement, PaymentProof, PaymentProviderKind,
    PaymentTransaction, Plan, ProviderEvent, Subscription, TransitionOutcome,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, PlanId, SubscriptionId, Timestamp, TransactionId, UserId,
};
use crate::ports::{
    BillingReader, CheckoutOpened, RecordOutcome, SubscriptionLedger, SubscriptionStatusView,
    WebhookEventLog, WebhookEventRecord,
};

/// Where an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// During checkout, after reconciliation but before the new rows are inserted.
    BeforeCheckoutInsert,
    /// During a transition, after the subscription is updated.
    BeforeTransactionWrite,
    /// During activation, after subscription and transaction are updated.
    BeforeEntitlementWrite,
}

#[derive(Debug, Clone, Default)]
struct BillingState {
    plans: HashMap<PlanId, Plan>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    transactions: HashMap<TransactionId, PaymentTransaction>,
    entitlements: HashMap<UserId, Entitlement>,
    webhook_events: HashMap<(PaymentProviderKind, String), WebhookEventRecord>,
}

impl BillingState {
    fn load_pair(
        &self,
        subscription_id: &SubscriptionId,
        transaction_id: &TransactionId,
    ) -> Result<(Subscription, PaymentTransaction), DomainError> {
        let subscription = self
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| subscription_missing(subscription_id))?;
        let transaction = self
            .transactions
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| transaction_missing(transaction_id))?;
        Ok((subscription, transaction))
    }

    fn holds_other_entitlement(&self, subscription: &Subscription) -> bool {
        self.subscriptions.values().any(|s| {
            s.user_id == subscription.user_id && s.id != subscription.id && s.is_entitling()
        })
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: BillingState,
    fault: Option<FaultPoint>,
}

impl Inner {
    fn check_fault(&mut self, point: FaultPoint) -> Result<(), DomainError> {
        if self.fault == Some(point) {
            self.fault = None;
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("injected fault at {:?}", point),
            ));
        }
        Ok(())
    }
}

/// In-memory implementation of the billing storage ports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Adds a catalog plan.
    pub async fn add_plan(&self, plan: Plan) {
        self.inner.write().await.state.plans.insert(plan.id, plan);
    }

    /// Stores a subscription directly, bypassing checkout.
    pub async fn seed_subscription(&self, subscription: Subscription) {
        self.inner
            .write()
            .await
            .state
            .subscriptions
            .insert(subscription.id, subscription);
    }

    /// Arms a one-shot fault for the next operation that reaches `point`.
    pub async fn fail_once(&self, point: FaultPoint) {
        self.inner.write().await.fault = Some(point);
    }

    pub async fn subscription(&self, id: &SubscriptionId) -> Option<Subscription> {
        self.inner.read().await.state.subscriptions.get(id).cloned()
    }

    pub async fn transaction(&self, id: &TransactionId) -> Option<PaymentTransaction> {
        self.inner.read().await.state.transactions.get(id).cloned()
    }

    /// All subscriptions of a user, oldest first.
    pub async fn subscriptions_for(&self, user_id: &UserId) -> Vec<Subscription> {
        let inner = self.inner.read().await;
        let mut subs: Vec<Subscription> = inner
            .state
            .subscriptions
            .values()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect();
        subs.sort_by_key(|s| s.created_at);
        subs
    }

    pub async fn webhook_event_count(&self) -> usize {
        self.inner.read().await.state.webhook_events.len()
    }
}

fn subscription_missing(id: &SubscriptionId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("Subscription {} not found", id),
    )
}

fn transaction_missing(id: &TransactionId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("Transaction {} not found", id),
    )
}

#[async_trait]
impl SubscriptionLedger for InMemoryBillingStore {
    async fn open_checkout(
        &self,
        subscription: Subscription,
        transaction: PaymentTransaction,
    ) -> Result<CheckoutOpened, DomainError> {
        let mut inner = self.inner.write().await;
        let mut next = inner.state.clone();
        let now = Timestamp::now();

        let mut reconciled = 0;
        for stale in next
            .subscriptions
            .values_mut()
            .filter(|s| s.user_id == subscription.user_id)
        {
            if stale.reconcile_stale(now).is_applied() {
                reconciled += 1;
            }
        }

        if next
            .subscriptions
            .values()
            .any(|s| s.user_id == subscription.user_id && s.is_entitling())
        {
            return Err(DomainError::new(
                ErrorCode::AlreadySubscribed,
                "You already have an active subscription",
            ));
        }

        inner.check_fault(FaultPoint::BeforeCheckoutInsert)?;
        next.subscriptions.insert(subscription.id, subscription.clone());
        next.transactions
            .insert(transaction.id.clone(), transaction.clone());

        inner.state = next;
        Ok(CheckoutOpened {
            subscription,
            transaction,
            reconciled,
        })
    }

    async fn attach_order_id(
        &self,
        transaction_id: &TransactionId,
        order_id: &str,
    ) -> Result<(), DomainError> {
        let mut inner = self.inner.write().await;
        let transaction = inner
            .state
            .transactions
            .get_mut(transaction_id)
            .ok_or_else(|| transaction_missing(transaction_id))?;
        transaction.attach_order_id(order_id, Timestamp::now());
        Ok(())
    }

    async fn activate(
        &self,
        subscription_id: &SubscriptionId,
        transaction_id: &TransactionId,
        proof: &PaymentProof,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut inner = self.inner.write().await;
        let mut next = inner.state.clone();

        let (mut subscription, mut transaction) =
            next.load_pair(subscription_id, transaction_id)?;
        let holds_other = next.holds_other_entitlement(&subscription);
        let activation = apply_activation(
            &mut subscription,
            &mut transaction,
            proof,
            holds_other,
            Timestamp::now(),
        )?;
        let Some(entitlement) = activation.entitlement else {
            return Ok(activation.outcome);
        };

        let user_id = subscription.user_id.clone();
        next.subscriptions.insert(subscription.id, subscription);
        inner.check_fault(FaultPoint::BeforeTransactionWrite)?;
        next.transactions.insert(transaction.id.clone(), transaction);
        inner.check_fault(FaultPoint::BeforeEntitlementWrite)?;
        next.entitlements.insert(user_id, entitlement);

        inner.state = next;
        Ok(activation.outcome)
    }

    async fn fail(
        &self,
        subscription_id: &SubscriptionId,
        transaction_id: &TransactionId,
        reason: &str,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut inner = self.inner.write().await;
        let mut next = inner.state.clone();

        let (mut subscription, mut transaction) =
            next.load_pair(subscription_id, transaction_id)?;
        let outcome = apply_failure(&mut subscription, &mut transaction, reason, Timestamp::now())?;
        if !outcome.is_applied() {
            return Ok(outcome);
        }

        next.subscriptions.insert(subscription.id, subscription);
        inner.check_fault(FaultPoint::BeforeTransactionWrite)?;
        next.transactions.insert(transaction.id.clone(), transaction);

        inner.state = next;
        Ok(outcome)
    }
}

#[async_trait]
impl BillingReader for InMemoryBillingStore {
    async fn find_plan(&self, plan_id: &PlanId) -> Result<Option<Plan>, DomainError> {
        Ok(self.inner.read().await.state.plans.get(plan_id).cloned())
    }

    async fn latest_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionStatusView>, DomainError> {
        let inner = self.inner.read().await;
        let state = &inner.state;
        let view = state
            .subscriptions
            .values()
            .filter(|s| &s.user_id == user_id)
            .filter_map(|s| state.plans.get(&s.plan_id).map(|plan| (s, plan)))
            .max_by_key(|(s, _)| (s.updated_at, s.created_at))
            .map(|(s, plan)| SubscriptionStatusView {
                id: s.id,
                status: s.status,
                billing_interval: s.billing_interval,
                current_period_start: s.current_period_start,
                current_period_end: s.current_period_end,
                auto_renew: s.auto_renew,
                plan_name: plan.name.clone(),
                plan_slug: plan.slug.clone(),
                currency: plan.currency().to_string(),
            });
        Ok(view)
    }

    async fn subscription_owner(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<UserId>, DomainError> {
        Ok(self
            .inner
            .read()
            .await
            .state
            .subscriptions
            .get(subscription_id)
            .map(|s| s.user_id.clone()))
    }

    async fn entitlement(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError> {
        Ok(self.inner.read().await.state.entitlements.get(user_id).cloned())
    }
}

#[async_trait]
impl WebhookEventLog for InMemoryBillingStore {
    async fn record_once(&self, event: &ProviderEvent) -> Result<RecordOutcome, DomainError> {
        let mut inner = self.inner.write().await;
        let key = (event.provider, event.event_id.clone());
        if let Some(existing) = inner.state.webhook_events.get(&key) {
            return Ok(RecordOutcome::duplicate(existing.processed));
        }
        inner
            .state
            .webhook_events
            .insert(key, WebhookEventRecord::received(event, Timestamp::now()));
        Ok(RecordOutcome::inserted())
    }

    async fn mark_processed(
        &self,
        provider: PaymentProviderKind,
        event_id: &str,
    ) -> Result<(), DomainError> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner
            .state
            .webhook_events
            .get_mut(&(provider, event_id.to_string()))
        {
            record.processed = true;
            record.processed_at = Some(Timestamp::now());
            record.error = None;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        provider: PaymentProviderKind,
        event_id: &str,
        error: &str,
    ) -> Result<(), DomainError> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner
            .state
            .webhook_events
            .get_mut(&(provider, event_id.to_string()))
        {
            record.error = Some(error.to_string());
        }
        Ok(())
    }

    async fn find(
        &self,
        provider: PaymentProviderKind,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self
            .inner
            .read()
            .await
            .state
            .webhook_events
            .get(&(provider, event_id.to_string()))
            .cloned())
    }
}
