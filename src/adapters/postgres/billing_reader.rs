//! PostgreSQL implementation of BillingReader.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::rows::{parse_column, EntitlementRow, PlanRow};
use crate::domain::billing::{BillingInterval, Entitlement, Plan, SubscriptionStatus};
use crate::domain::foundation::{DomainError, PlanId, SubscriptionId, Timestamp, UserId};
use crate::ports::{BillingReader, SubscriptionStatusView};

/// Read-side billing queries.
pub struct PostgresBillingReader {
    pool: PgPool,
}

impl PostgresBillingReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    id: Uuid,
    status: String,
    billing_interval: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    auto_renew: bool,
    plan_name: String,
    plan_slug: String,
    currency: String,
}

impl TryFrom<StatusRow> for SubscriptionStatusView {
    type Error = DomainError;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionStatusView {
            id: SubscriptionId::from_uuid(row.id),
            status: parse_column::<SubscriptionStatus>("status", &row.status)?,
            billing_interval: parse_column::<BillingInterval>("billing_interval", &row.billing_interval)?,
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            auto_renew: row.auto_renew,
            plan_name: row.plan_name,
            plan_slug: row.plan_slug,
            currency: row.currency,
        })
    }
}

#[async_trait]
impl BillingReader for PostgresBillingReader {
    async fn find_plan(&self, plan_id: &PlanId) -> Result<Option<Plan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, name, slug, description, plan_type, price_monthly_cents,
                   price_yearly_cents, currency
            FROM subscription_plans
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(plan_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find plan", e))?;

        row.map(Plan::try_from).transpose()
    }

    async fn latest_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionStatusView>, DomainError> {
        let row: Option<StatusRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.status, s.billing_interval, s.current_period_start,
                   s.current_period_end, s.auto_renew,
                   p.name AS plan_name, p.slug AS plan_slug, p.currency
            FROM user_subscriptions s
            INNER JOIN subscription_plans p ON p.id = s.plan_id
            WHERE s.user_id = $1
            ORDER BY s.updated_at DESC, s.created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load subscription status", e))?;

        row.map(SubscriptionStatusView::try_from).transpose()
    }

    async fn subscription_owner(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<UserId>, DomainError> {
        let owner: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM user_subscriptions WHERE id = $1")
                .bind(subscription_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to load subscription owner", e))?;

        Ok(owner.map(UserId::new).transpose()?)
    }

    async fn entitlement(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError> {
        let row: Option<EntitlementRow> = sqlx::query_as(
            r#"
            SELECT is_paid_user, payment_status, paid_at, payment_provider, payment_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load entitlement", e))?;

        row.map(Entitlement::try_from).transpose()
    }
}
