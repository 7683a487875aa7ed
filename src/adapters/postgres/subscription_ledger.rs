//! PostgreSQL implementation of SubscriptionLedger.
//!
//! Every method runs in one database transaction. Checkout and activation
//! lock the user row first (`SELECT ... FOR UPDATE`), which serializes
//! concurrent attempts for the same user; the partial unique index on
//! pending subscriptions is the backstop.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::rows::{SubscriptionRow, TransactionRow, SUBSCRIPTION_COLUMNS, TRANSACTION_COLUMNS};
use crate::domain::billing::{
    apply_activation, apply_failure, Entitlement, PaymentProof, PaymentTransaction, Subscription,
    SubscriptionStatus, TransitionOutcome, SUPERSEDED_REASON,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, SubscriptionId, Timestamp, TransactionId, UserId,
};
use crate::ports::{CheckoutOpened, SubscriptionLedger};

const ONE_PENDING_INDEX: &str = "idx_user_subscriptions_one_pending";

/// PostgreSQL implementation of the SubscriptionLedger port.
pub struct PostgresSubscriptionLedger {
    pool: PgPool,
}

impl PostgresSubscriptionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entitling_statuses() -> Vec<String> {
    SubscriptionStatus::ENTITLING
        .iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

/// Takes the per-user lock, creating the user row if the platform has not yet.
async fn lock_user(conn: &mut PgConnection, user_id: &UserId) -> Result<(), DomainError> {
    sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
        .bind(user_id.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| DomainError::database("Failed to ensure user", e))?;

    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| DomainError::database("Failed to lock user", e))?;
    Ok(())
}

/// Locks the owner of `subscription_id` before any subscription row, matching
/// the lock order of `open_checkout`.
async fn lock_owner(
    conn: &mut PgConnection,
    subscription_id: &SubscriptionId,
) -> Result<(), DomainError> {
    let owner: Option<String> =
        sqlx::query_scalar("SELECT user_id FROM user_subscriptions WHERE id = $1")
            .bind(subscription_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| DomainError::database("Failed to load subscription owner", e))?;
    match owner {
        Some(owner) => lock_user(conn, &UserId::new(owner)?).await,
        None => Ok(()),
    }
}

async fn holds_other_entitlement(
    conn: &mut PgConnection,
    subscription: &Subscription,
) -> Result<bool, DomainError> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM user_subscriptions
            WHERE user_id = $1 AND id <> $2 AND status = ANY($3)
        )
        "#,
    )
    .bind(subscription.user_id.as_str())
    .bind(subscription.id.as_uuid())
    .bind(entitling_statuses())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| DomainError::database("Failed to check entitlement", e))
}

async fn load_pair(
    conn: &mut PgConnection,
    subscription_id: &SubscriptionId,
    transaction_id: &TransactionId,
) -> Result<(Subscription, PaymentTransaction), DomainError> {
    let subscription: Option<SubscriptionRow> = sqlx::query_as(&format!(
        "SELECT {} FROM user_subscriptions WHERE id = $1 FOR UPDATE",
        SUBSCRIPTION_COLUMNS
    ))
    .bind(subscription_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| DomainError::database("Failed to load subscription", e))?;
    let subscription = subscription
        .ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription {} not found", subscription_id),
            )
        })
        .and_then(Subscription::try_from)?;

    let transaction: Option<TransactionRow> = sqlx::query_as(&format!(
        "SELECT {} FROM payment_transactions WHERE id = $1 FOR UPDATE",
        TRANSACTION_COLUMNS
    ))
    .bind(transaction_id.as_str())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| DomainError::database("Failed to load transaction", e))?;
    let transaction = transaction
        .ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Transaction {} not found", transaction_id),
            )
        })
        .and_then(PaymentTransaction::try_from)?;

    Ok((subscription, transaction))
}

async fn save_subscription(conn: &mut PgConnection, sub: &Subscription) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE user_subscriptions SET
            status = $2,
            start_date = $3,
            current_period_start = $4,
            current_period_end = $5,
            cancelled_at = $6,
            cancellation_reason = $7,
            updated_at = $8
        WHERE id = $1
        "#,
    )
    .bind(sub.id.as_uuid())
    .bind(sub.status.as_str())
    .bind(sub.start_date.as_datetime())
    .bind(sub.current_period_start.map(Timestamp::into_datetime))
    .bind(sub.current_period_end.map(Timestamp::into_datetime))
    .bind(sub.cancelled_at.map(Timestamp::into_datetime))
    .bind(&sub.cancellation_reason)
    .bind(sub.updated_at.as_datetime())
    .execute(&mut *conn)
    .await
    .map_err(|e| DomainError::database("Failed to update subscription", e))?;
    Ok(())
}

async fn save_transaction(
    conn: &mut PgConnection,
    txn: &PaymentTransaction,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE payment_transactions SET
            status = $2,
            stripe_payment_intent_id = $3,
            stripe_charge_id = $4,
            razorpay_order_id = $5,
            razorpay_payment_id = $6,
            invoice_url = $7,
            failure_message = $8,
            updated_at = $9
        WHERE id = $1
        "#,
    )
    .bind(txn.id.as_str())
    .bind(txn.status.as_str())
    .bind(&txn.proof.stripe_payment_intent_id)
    .bind(&txn.proof.stripe_charge_id)
    .bind(&txn.proof.razorpay_order_id)
    .bind(&txn.proof.razorpay_payment_id)
    .bind(&txn.proof.invoice_url)
    .bind(&txn.failure_message)
    .bind(txn.updated_at.as_datetime())
    .execute(&mut *conn)
    .await
    .map_err(|e| DomainError::database("Failed to update transaction", e))?;
    Ok(())
}

async fn save_entitlement(
    conn: &mut PgConnection,
    user_id: &UserId,
    entitlement: &Entitlement,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE users SET
            is_paid_user = $2,
            payment_status = $3,
            paid_at = $4,
            payment_provider = $5,
            payment_id = $6
        WHERE id = $1
        "#,
    )
    .bind(user_id.as_str())
    .bind(entitlement.is_paid_user)
    .bind(entitlement.payment_status.as_str())
    .bind(entitlement.paid_at.map(Timestamp::into_datetime))
    .bind(entitlement.payment_provider.map(|p| p.as_str()))
    .bind(&entitlement.payment_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| DomainError::database("Failed to update user entitlement", e))?;
    Ok(())
}

#[async_trait]
impl SubscriptionLedger for PostgresSubscriptionLedger {
    async fn open_checkout(
        &self,
        subscription: Subscription,
        transaction: PaymentTransaction,
    ) -> Result<CheckoutOpened, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;
        let now = Timestamp::now();

        lock_user(&mut tx, &subscription.user_id).await?;

        let reconciled = sqlx::query(
            r#"
            UPDATE user_subscriptions SET
                status = 'cancelled',
                cancelled_at = $2,
                cancellation_reason = $3,
                updated_at = $2
            WHERE user_id = $1 AND status = 'pending'
            "#,
        )
        .bind(subscription.user_id.as_str())
        .bind(now.as_datetime())
        .bind(SUPERSEDED_REASON)
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to reconcile pending subscriptions", e))?
        .rows_affected();

        let entitled = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_subscriptions WHERE user_id = $1 AND status = ANY($2))",
        )
        .bind(subscription.user_id.as_str())
        .bind(entitling_statuses())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to check entitlement", e))?;
        if entitled {
            // Dropping `tx` rolls back the reconciliation too.
            return Err(DomainError::new(
                ErrorCode::AlreadySubscribed,
                "You already have an active subscription",
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO user_subscriptions (
                id, user_id, plan_id, status, billing_interval, start_date, auto_renew,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(subscription.plan_id.as_uuid())
        .bind(subscription.status.as_str())
        .bind(subscription.billing_interval.as_str())
        .bind(subscription.start_date.as_datetime())
        .bind(subscription.auto_renew)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(ONE_PENDING_INDEX) {
                    return DomainError::new(ErrorCode::Conflict, "Checkout already in progress");
                }
            }
            DomainError::database("Failed to insert subscription", e)
        })?;

        sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                id, user_id, subscription_id, payment_provider, amount_cents, currency,
                status, description, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(transaction.id.as_str())
        .bind(transaction.user_id.as_str())
        .bind(transaction.subscription_id.as_uuid())
        .bind(transaction.provider.as_str())
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(transaction.status.as_str())
        .bind(&transaction.description)
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to insert transaction", e))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit checkout", e))?;

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
        let result = sqlx::query(
            "UPDATE payment_transactions SET razorpay_order_id = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(transaction_id.as_str())
        .bind(order_id)
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to attach order id", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Transaction {} not found", transaction_id),
            ));
        }
        Ok(())
    }

    async fn activate(
        &self,
        subscription_id: &SubscriptionId,
        transaction_id: &TransactionId,
        proof: &PaymentProof,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        lock_owner(&mut tx, subscription_id).await?;
        let (mut subscription, mut transaction) =
            load_pair(&mut tx, subscription_id, transaction_id).await?;
        let holds_other = holds_other_entitlement(&mut tx, &subscription).await?;

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

        save_subscription(&mut tx, &subscription).await?;
        save_transaction(&mut tx, &transaction).await?;
        save_entitlement(&mut tx, &subscription.user_id, &entitlement).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit activation", e))?;
        Ok(activation.outcome)
    }

    async fn fail(
        &self,
        subscription_id: &SubscriptionId,
        transaction_id: &TransactionId,
        reason: &str,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        let (mut subscription, mut transaction) =
            load_pair(&mut tx, subscription_id, transaction_id).await?;
        let outcome = apply_failure(&mut subscription, &mut transaction, reason, Timestamp::now())?;
        if !outcome.is_applied() {
            return Ok(outcome);
        }

        save_subscription(&mut tx, &subscription).await?;
        save_transaction(&mut tx, &transaction).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit failure", e))?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entitling_statuses_exclude_pending_and_cancelled() {
        let statuses = entitling_statuses();
        assert!(statuses.contains(&"active".to_string()));
        assert!(statuses.contains(&"past_due".to_string()));
        assert!(!statuses.contains(&"pending".to_string()));
        assert!(!statuses.contains(&"cancelled".to_string()));
    }
}
