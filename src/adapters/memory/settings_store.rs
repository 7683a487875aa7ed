//! In-memory settings store.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::ports::{PaymentSettingsStore, SettingKey, StoredPaymentSettings};

/// Key-value settings held in memory, normalized on load like the database rows.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettingsStore {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw setting value (a string or `{"value": ...}`).
    pub async fn set(&self, key: SettingKey, value: Value) {
        self.entries
            .write()
            .await
            .insert(key.as_str().to_string(), value);
    }

    pub async fn remove(&self, key: SettingKey) {
        self.entries.write().await.remove(key.as_str());
    }
}

#[async_trait]
impl PaymentSettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<StoredPaymentSettings, DomainError> {
        let entries = self.entries.read().await;
        Ok(StoredPaymentSettings::from_entries(
            entries.iter().map(|(k, v)| (k.as_str(), v)),
        ))
    }
}
