//! SettingsResolver - merges admin settings with environment fallbacks.
//!
//! Read fresh for every checkout and webhook so credentials rotated through
//! the admin panel apply without a restart. Each key resolves on its own:
//! a stored value wins, otherwise the environment value is used.

use std::sync::Arc;

use secrecy::SecretString;

use crate::config::PaymentConfig;
use crate::domain::billing::{BillingError, PaymentProviderKind};
use crate::ports::{PaymentSettingsStore, ProviderCredentials, StoredPaymentSettings};

/// Fully resolved payment settings.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub default_provider: PaymentProviderKind,
    pub success_url: String,
    pub cancel_url: String,
    pub default_currency: String,
    stripe_secret_key: Option<SecretString>,
    stripe_publishable_key: Option<String>,
    stripe_webhook_secret: Option<SecretString>,
    razorpay_key_id: Option<String>,
    razorpay_key_secret: Option<SecretString>,
    razorpay_webhook_secret: Option<SecretString>,
}

impl PaymentSettings {
    /// Stored values first, environment second.
    pub fn merge(stored: StoredPaymentSettings, env: &PaymentConfig) -> Self {
        Self {
            default_provider: stored.payment_provider.unwrap_or(env.default_provider),
            success_url: stored
                .billing_success_url
                .unwrap_or_else(|| env.billing_success_url.clone()),
            cancel_url: stored
                .billing_cancel_url
                .unwrap_or_else(|| env.billing_cancel_url.clone()),
            default_currency: env.default_currency.clone(),
            stripe_secret_key: stored
                .stripe_secret_key
                .or_else(|| env.stripe_secret_key.clone()),
            stripe_publishable_key: stored
                .stripe_publishable_key
                .or_else(|| env.stripe_publishable_key.clone()),
            stripe_webhook_secret: stored
                .stripe_webhook_secret
                .or_else(|| env.stripe_webhook_secret.clone()),
            razorpay_key_id: stored
                .razorpay_key_id
                .or_else(|| env.razorpay_key_id.clone()),
            razorpay_key_secret: stored
                .razorpay_key_secret
                .or_else(|| env.razorpay_key_secret.clone()),
            razorpay_webhook_secret: stored
                .razorpay_webhook_secret
                .or_else(|| env.razorpay_webhook_secret.clone()),
        }
    }

    /// The provider for a checkout: the caller's hint, else the platform default.
    pub fn provider(&self, hint: Option<PaymentProviderKind>) -> PaymentProviderKind {
        hint.unwrap_or(self.default_provider)
    }

    /// API credentials for opening checkouts.
    ///
    /// # Errors
    ///
    /// - `ProviderNotConfigured` naming the first missing key
    pub fn credentials(
        &self,
        provider: PaymentProviderKind,
    ) -> Result<ProviderCredentials, BillingError> {
        match provider {
            PaymentProviderKind::Stripe => {
                let secret_key = self.stripe_secret_key.clone().ok_or_else(|| {
                    BillingError::provider_not_configured(provider, "secret key")
                })?;
                Ok(ProviderCredentials::Stripe {
                    secret_key,
                    publishable_key: self.stripe_publishable_key.clone(),
                })
            }
            PaymentProviderKind::Razorpay => {
                let key_id = self
                    .razorpay_key_id
                    .clone()
                    .ok_or_else(|| BillingError::provider_not_configured(provider, "key id"))?;
                let key_secret = self.razorpay_key_secret()?.clone();
                Ok(ProviderCredentials::Razorpay { key_id, key_secret })
            }
        }
    }

    /// Signing secret for inbound webhooks.
    ///
    /// # Errors
    ///
    /// - `WebhookNotConfigured` when no secret is set
    pub fn webhook_secret(
        &self,
        provider: PaymentProviderKind,
    ) -> Result<&SecretString, BillingError> {
        let secret = match provider {
            PaymentProviderKind::Stripe => self.stripe_webhook_secret.as_ref(),
            PaymentProviderKind::Razorpay => self.razorpay_webhook_secret.as_ref(),
        };
        secret.ok_or(BillingError::WebhookNotConfigured(provider))
    }

    /// Razorpay API key secret, which also signs client-side payment proofs.
    pub fn razorpay_key_secret(&self) -> Result<&SecretString, BillingError> {
        self.razorpay_key_secret.as_ref().ok_or_else(|| {
            BillingError::provider_not_configured(PaymentProviderKind::Razorpay, "key secret")
        })
    }
}

/// Loads settings from the store and applies environment fallbacks.
pub struct SettingsResolver {
    store: Arc<dyn PaymentSettingsStore>,
    env: PaymentConfig,
}

impl SettingsResolver {
    pub fn new(store: Arc<dyn PaymentSettingsStore>, env: PaymentConfig) -> Self {
        Self { store, env }
    }

    pub async fn resolve(&self) -> Result<PaymentSettings, BillingError> {
        let stored = self.store.load().await?;
        Ok(PaymentSettings::merge(stored, &self.env))
    }
}
