//! Subscription aggregate.
//!
//! One row per purchase attempt. Retries never resurrect a row with a new
//! transaction; they open a fresh subscription and write the old pending
//! one off.
//!
//! # Invariants
//!
//! - A user holds at most one subscription in an entitling status.
//! - `pending` rows do not count toward that limit.
//! - Period dates are set together, on activation.

use serde::{Deserialize, Serialize};

use super::{BillingError, BillingInterval, SubscriptionStatus};
use crate::domain::foundation::{PlanId, StateMachine, SubscriptionId, Timestamp, UserId};

/// Reason recorded on pending rows cancelled by a newer checkout.
pub const SUPERSEDED_REASON: &str = "Superseded by a new checkout";

/// Result of asking the aggregate to change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// State changed; caller must persist.
    Applied,
    /// Target state already held; nothing to write.
    AlreadyApplied,
    /// Request refused without error; nothing to write.
    Ignored,
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied)
    }
}

/// Subscription aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    pub billing_interval: BillingInterval,
    pub start_date: Timestamp,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub auto_renew: bool,
    pub cancelled_at: Option<Timestamp>,
    pub cancellation_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Opens a new pending subscription for a checkout attempt.
    pub fn open_pending(
        user_id: UserId,
        plan_id: PlanId,
        billing_interval: BillingInterval,
        now: Timestamp,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            plan_id,
            status: SubscriptionStatus::Pending,
            billing_interval,
            start_date: now,
            current_period_start: None,
            current_period_end: None,
            auto_renew: true,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_entitling(&self) -> bool {
        self.status.is_entitling()
    }

    /// Marks the subscription paid and opens its first period.
    ///
    /// Already-active subscriptions are left untouched so a second proof
    /// for the same purchase cannot move the period end. Any other row is
    /// refused when the user already holds a different entitling
    /// subscription (`holds_other_entitlement`).
    pub fn activate(
        &mut self,
        now: Timestamp,
        holds_other_entitlement: bool,
    ) -> Result<TransitionOutcome, BillingError> {
        match self.status {
            SubscriptionStatus::Active => return Ok(TransitionOutcome::AlreadyApplied),
            _ if holds_other_entitlement => {
                return Err(BillingError::conflict(format!(
                    "user {} already holds another entitling subscription; subscription {} was paid in {} state",
                    self.user_id, self.id, self.status
                )));
            }
            _ => {}
        }

        self.status = self
            .status
            .transition_to(SubscriptionStatus::Active)
            .map_err(|_| BillingError::invalid_state(self.status.as_str(), "activate"))?;
        self.start_date = now;
        self.current_period_start = Some(now);
        self.current_period_end = Some(self.billing_interval.period_end(now));
        self.cancelled_at = None;
        self.cancellation_reason = None;
        self.updated_at = now;
        Ok(TransitionOutcome::Applied)
    }

    /// Writes off a checkout whose payment failed.
    ///
    /// Cancelled rows are already in the target state. Entitling rows are
    /// left alone: a late failure event must not cancel a paid subscription.
    pub fn fail(&mut self, reason: &str, now: Timestamp) -> TransitionOutcome {
        match self.status {
            SubscriptionStatus::Cancelled => TransitionOutcome::AlreadyApplied,
            SubscriptionStatus::Pending => {
                self.cancel(reason, now);
                TransitionOutcome::Applied
            }
            _ => TransitionOutcome::Ignored,
        }
    }

    /// Cancels a pending row left behind by an abandoned checkout.
    pub fn reconcile_stale(&mut self, now: Timestamp) -> TransitionOutcome {
        if self.status != SubscriptionStatus::Pending {
            return TransitionOutcome::Ignored;
        }
        self.cancel(SUPERSEDED_REASON, now);
        TransitionOutcome::Applied
    }

    fn cancel(&mut self, reason: &str, now: Timestamp) {
        self.status = SubscriptionStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancellation_reason = Some(reason.to_string());
        self.updated_at = now;
    }
}
