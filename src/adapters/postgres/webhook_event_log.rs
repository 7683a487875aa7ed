//! PostgreSQL implementation of WebhookEventLog.
//!
//! `record_once` is a single `INSERT ... ON CONFLICT DO NOTHING` on the
//! `(provider, event_id)` unique key, so concurrent deliveries of one event
//! race on the index rather than on application code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use super::rows::parse_column;
use crate::domain::billing::{PaymentProviderKind, ProviderEvent};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{RecordOutcome, WebhookEventLog, WebhookEventRecord};

pub struct PostgresWebhookEventLog {
    pool: PgPool,
}

impl PostgresWebhookEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    provider: String,
    event_id: String,
    event_type: String,
    payload: Value,
    processed: bool,
    processed_at: Option<DateTime<Utc>>,
    error: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<WebhookEventRow> for WebhookEventRecord {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        Ok(WebhookEventRecord {
            provider: parse_column::<PaymentProviderKind>("provider", &row.provider)?,
            event_id: row.event_id,
            event_type: row.event_type,
            payload: row.payload,
            processed: row.processed,
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            error: row.error,
            received_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn event_missing(provider: PaymentProviderKind, event_id: &str) -> DomainError {
    DomainError::new(
        ErrorCode::InternalError,
        format!("{} webhook event {} not logged", provider.display_name(), event_id),
    )
}

#[async_trait]
impl WebhookEventLog for PostgresWebhookEventLog {
    async fn record_once(&self, event: &ProviderEvent) -> Result<RecordOutcome, DomainError> {
        let record = WebhookEventRecord::received(event, Timestamp::now());

        let inserted = sqlx::query(
            r#"
            INSERT INTO webhook_events (provider, event_id, event_type, payload, processed, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            ON CONFLICT (provider, event_id) DO NOTHING
            "#,
        )
        .bind(record.provider.as_str())
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(&record.payload)
        .bind(record.received_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record webhook event", e))?
        .rows_affected();

        if inserted == 1 {
            return Ok(RecordOutcome::inserted());
        }

        let processed: bool = sqlx::query_scalar(
            "SELECT processed FROM webhook_events WHERE provider = $1 AND event_id = $2",
        )
        .bind(record.provider.as_str())
        .bind(&record.event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to read webhook event", e))?;

        Ok(RecordOutcome::duplicate(processed))
    }

    async fn mark_processed(
        &self,
        provider: PaymentProviderKind,
        event_id: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events SET processed = TRUE, processed_at = $3, error = NULL
            WHERE provider = $1 AND event_id = $2
            "#,
        )
        .bind(provider.as_str())
        .bind(event_id)
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to mark webhook processed", e))?;

        if result.rows_affected() == 0 {
            return Err(event_missing(provider, event_id));
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        provider: PaymentProviderKind,
        event_id: &str,
        error: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE webhook_events SET error = $3 WHERE provider = $1 AND event_id = $2",
        )
        .bind(provider.as_str())
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record webhook error", e))?;

        if result.rows_affected() == 0 {
            return Err(event_missing(provider, event_id));
        }
        Ok(())
    }

    async fn find(
        &self,
        provider: PaymentProviderKind,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT provider, event_id, event_type, payload, processed, processed_at, error, created_at
            FROM webhook_events
            WHERE provider = $1 AND event_id = $2
            "#,
        )
        .bind(provider.as_str())
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find webhook event", e))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_maps_to_record() {
        let now = Utc::now();
        let record = WebhookEventRecord::try_from(WebhookEventRow {
            provider: "razorpay".to_string(),
            event_id: "payment.captured:pay_1".to_string(),
            event_type: "payment.captured".to_string(),
            payload: json!({"event": "payment.captured"}),
            processed: false,
            processed_at: None,
            error: Some("boom".to_string()),
            created_at: now,
        })
        .unwrap();

        assert_eq!(record.provider, PaymentProviderKind::Razorpay);
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert_eq!(record.received_at, Timestamp::from_datetime(now));
    }

    #[test]
    fn unknown_provider_is_a_database_error() {
        let err = WebhookEventRecord::try_from(WebhookEventRow {
            provider: "paypal".to_string(),
            event_id: "e".to_string(),
            event_type: "t".to_string(),
            payload: json!({}),
            processed: true,
            processed_at: None,
            error: None,
            created_at: Utc::now(),
        })
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
