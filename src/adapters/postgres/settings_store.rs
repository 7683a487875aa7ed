//! PostgreSQL implementation of PaymentSettingsStore over `admin_settings`.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::domain::foundation::DomainError;
use crate::ports::{PaymentSettingsStore, SettingKey, StoredPaymentSettings};

pub struct PostgresSettingsStore {
    pool: PgPool,
}

impl PostgresSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn setting_keys() -> Vec<String> {
    SettingKey::ALL.iter().map(|k| k.as_str().to_string()).collect()
}

#[async_trait]
impl PaymentSettingsStore for PostgresSettingsStore {
    async fn load(&self) -> Result<StoredPaymentSettings, DomainError> {
        let rows: Vec<(String, Option<Value>)> =
            sqlx::query_as("SELECT key, value FROM admin_settings WHERE key = ANY($1)")
                .bind(setting_keys())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to load payment settings", e))?;

        Ok(StoredPaymentSettings::from_entries(
            rows.iter()
                .filter_map(|(key, value)| value.as_ref().map(|v| (key.as_str(), v))),
        ))
    }
}
