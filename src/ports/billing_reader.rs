//! BillingReader port - read-side queries for checkout and status.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::billing::{BillingInterval, Entitlement, Plan, SubscriptionStatus};
use crate::domain::foundation::{DomainError, PlanId, SubscriptionId, Timestamp, UserId};

/// A user's most recent subscription joined with its plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionStatusView {
    pub id: SubscriptionId,
    pub status: SubscriptionStatus,
    pub billing_interval: BillingInterval,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub auto_renew: bool,
    pub plan_name: String,
    pub plan_slug: String,
    pub currency: String,
}

/// Read access for billing queries.
#[async_trait]
pub trait BillingReader: Send + Sync {
    /// Finds an active catalog plan.
    async fn find_plan(&self, plan_id: &PlanId) -> Result<Option<Plan>, DomainError>;

    /// The user's most recently updated subscription, if any.
    async fn latest_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionStatusView>, DomainError>;

    /// The user a subscription belongs to, if it exists.
    async fn subscription_owner(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<UserId>, DomainError>;

    /// The user's entitlement projection, if the user exists.
    async fn entitlement(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError>;
}
