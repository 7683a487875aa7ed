//! Row types and column mapping shared by the billing adapters.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::billing::{
    BillingInterval, Entitlement, EntitlementStatus, PaymentProof, PaymentProviderKind,
    PaymentTransaction, Plan, PlanType, Subscription, SubscriptionStatus, TransactionStatus,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, PlanId, SubscriptionId, Timestamp, TransactionId, UserId,
};

/// Parses a text column into a domain enum, reporting the column on failure.
pub(super) fn parse_column<T: FromStr>(column: &str, raw: &str) -> Result<T, DomainError> {
    raw.parse::<T>().map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value: {}", column, raw),
        )
    })
}

fn user_id(raw: String) -> Result<UserId, DomainError> {
    UserId::new(raw)
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e)))
}

fn ts(dt: DateTime<Utc>) -> Timestamp {
    Timestamp::from_datetime(dt)
}

pub(super) const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan_id, status, billing_interval, \
    start_date, current_period_start, current_period_end, auto_renew, cancelled_at, \
    cancellation_reason, created_at, updated_at";

pub(super) const TRANSACTION_COLUMNS: &str = "id, user_id, subscription_id, payment_provider, \
    amount_cents, currency, status, description, stripe_payment_intent_id, stripe_charge_id, \
    razorpay_order_id, razorpay_payment_id, invoice_url, failure_message, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct PlanRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub plan_type: String,
    pub price_monthly_cents: i64,
    pub price_yearly_cents: Option<i64>,
    pub currency: String,
}

impl TryFrom<PlanRow> for Plan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        Ok(Plan {
            id: PlanId::from_uuid(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            plan_type: parse_column::<PlanType>("plan_type", &row.plan_type)?,
            price_monthly: row.price_monthly_cents,
            price_yearly: row.price_yearly_cents,
            currency: row.currency,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: String,
    pub plan_id: Uuid,
    pub status: String,
    pub billing_interval: String,
    pub start_date: DateTime<Utc>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: user_id(row.user_id)?,
            plan_id: PlanId::from_uuid(row.plan_id),
            status: parse_column::<SubscriptionStatus>("status", &row.status)?,
            billing_interval: parse_column::<BillingInterval>("billing_interval", &row.billing_interval)?,
            start_date: ts(row.start_date),
            current_period_start: row.current_period_start.map(ts),
            current_period_end: row.current_period_end.map(ts),
            auto_renew: row.auto_renew,
            cancelled_at: row.cancelled_at.map(ts),
            cancellation_reason: row.cancellation_reason,
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct TransactionRow {
    pub id: String,
    pub user_id: String,
    pub subscription_id: Uuid,
    pub payment_provider: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub description: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_charge_id: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub invoice_url: Option<String>,
    pub failure_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for PaymentTransaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(PaymentTransaction {
            id: TransactionId::new(row.id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid transaction id: {}", e))
            })?,
            user_id: user_id(row.user_id)?,
            subscription_id: SubscriptionId::from_uuid(row.subscription_id),
            provider: parse_column::<PaymentProviderKind>("payment_provider", &row.payment_provider)?,
            amount: row.amount_cents,
            currency: row.currency,
            status: parse_column::<TransactionStatus>("status", &row.status)?,
            description: row.description,
            proof: PaymentProof {
                stripe_payment_intent_id: row.stripe_payment_intent_id,
                stripe_charge_id: row.stripe_charge_id,
                razorpay_payment_id: row.razorpay_payment_id,
                razorpay_order_id: row.razorpay_order_id,
                invoice_url: row.invoice_url,
            },
            failure_message: row.failure_message,
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct EntitlementRow {
    pub is_paid_user: bool,
    pub payment_status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_provider: Option<String>,
    pub payment_id: Option<String>,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        Ok(Entitlement {
            is_paid_user: row.is_paid_user,
            payment_status: parse_column::<EntitlementStatus>("payment_status", &row.payment_status)?,
            paid_at: row.paid_at.map(ts),
            payment_provider: row
                .payment_provider
                .as_deref()
                .map(|raw| parse_column::<PaymentProviderKind>("payment_provider", raw))
                .transpose()?,
            payment_id: row.payment_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription_row() -> SubscriptionRow {
        let now = Utc::now();
        SubscriptionRow {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            plan_id: Uuid::new_v4(),
            status: "active".to_string(),
            billing_interval: "yearly".to_string(),
            start_date: now,
            current_period_start: Some(now),
            current_period_end: None,
            auto_renew: true,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn parse_column_names_the_column() {
        let err = parse_column::<SubscriptionStatus>("status", "bogus").unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("status"));
        assert!(err.message.contains("bogus"));
    }

    #[test]
    fn subscription_row_maps_enums() {
        let sub = Subscription::try_from(subscription_row()).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.billing_interval, BillingInterval::Yearly);
        assert_eq!(sub.user_id.as_str(), "user-1");
    }

    #[test]
    fn subscription_row_with_unknown_status_fails() {
        let mut row = subscription_row();
        row.status = "trialing".to_string();
        assert!(Subscription::try_from(row).is_err());
    }

    #[test]
    fn subscription_row_with_empty_user_fails() {
        let mut row = subscription_row();
        row.user_id = String::new();
        assert!(Subscription::try_from(row).is_err());
    }

    #[test]
    fn transaction_row_rebuilds_proof() {
        let now = Utc::now();
        let txn = PaymentTransaction::try_from(TransactionRow {
            id: "abc123".to_string(),
            user_id: "user-1".to_string(),
            subscription_id: Uuid::new_v4(),
            payment_provider: "razorpay".to_string(),
            amount_cents: 49900,
            currency: "INR".to_string(),
            status: "paid".to_string(),
            description: None,
            stripe_payment_intent_id: None,
            stripe_charge_id: None,
            razorpay_order_id: Some("order_1".to_string()),
            razorpay_payment_id: Some("pay_1".to_string()),
            invoice_url: None,
            failure_message: None,
            created_at: now,
            updated_at: now,
        })
        .unwrap();

        assert_eq!(txn.status, TransactionStatus::Paid);
        assert_eq!(txn.provider, PaymentProviderKind::Razorpay);
        assert_eq!(txn.proof.payment_id(), Some("pay_1"));
    }

    #[test]
    fn entitlement_row_without_provider_maps_to_none() {
        let e = Entitlement::try_from(EntitlementRow {
            is_paid_user: false,
            payment_status: "pending".to_string(),
            paid_at: None,
            payment_provider: None,
            payment_id: None,
        })
        .unwrap();
        assert_eq!(e, Entitlement::default());
    }

    #[test]
    fn plan_row_maps_prices() {
        let plan = Plan::try_from(PlanRow {
            id: Uuid::new_v4(),
            name: "Premium".to_string(),
            slug: "premium".to_string(),
            description: None,
            plan_type: "organization".to_string(),
            price_monthly_cents: 999,
            price_yearly_cents: None,
            currency: "INR".to_string(),
        })
        .unwrap();
        assert_eq!(plan.plan_type, PlanType::Organization);
        assert_eq!(plan.price_monthly, 999);
    }
}
