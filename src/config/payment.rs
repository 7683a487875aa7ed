//! Payment configuration
//!
//! Environment fallback for provider credentials and redirect URLs. The
//! admin settings store takes precedence over everything here; see
//! `application::SettingsResolver`.
//!
//! These variables are read unprefixed because they are shared with the
//! rest of the platform's deployment.

use secrecy::SecretString;

use super::error::ValidationError;
use crate::domain::billing::{PaymentProviderKind, DEFAULT_CURRENCY};

/// Client origin used when neither base URL variable is set.
pub const DEFAULT_APP_BASE_URL: &str = "http://localhost:5173";

/// Payment configuration from the environment.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub default_provider: PaymentProviderKind,

    pub stripe_secret_key: Option<SecretString>,
    pub stripe_publishable_key: Option<String>,
    pub stripe_webhook_secret: Option<SecretString>,

    pub razorpay_key_id: Option<String>,
    pub razorpay_key_secret: Option<SecretString>,
    pub razorpay_webhook_secret: Option<SecretString>,

    /// Client origin the billing pages live under
    pub app_base_url: String,
    pub billing_success_url: String,
    pub billing_cancel_url: String,

    /// Currency for plans stored without one
    pub default_currency: String,
}

impl PaymentConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let secret = |key: &str| get(key).map(SecretString::new);

        let app_base_url = get("APP_BASE_URL")
            .or_else(|| get("CLIENT_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_APP_BASE_URL.to_string());
        let base = app_base_url.trim_end_matches('/');
        let billing_success_url = get("BILLING_SUCCESS_URL")
            .unwrap_or_else(|| format!("{}/billing-status?status=success", base));
        let billing_cancel_url = get("BILLING_CANCEL_URL")
            .unwrap_or_else(|| format!("{}/billing-status?status=cancelled", base));

        Self {
            default_provider: get("PAYMENT_PROVIDER")
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
            stripe_secret_key: secret("STRIPE_SECRET_KEY"),
            stripe_publishable_key: get("STRIPE_PUBLISHABLE_KEY"),
            stripe_webhook_secret: secret("STRIPE_WEBHOOK_SECRET"),
            razorpay_key_id: get("RAZORPAY_KEY_ID"),
            razorpay_key_secret: secret("RAZORPAY_KEY_SECRET"),
            razorpay_webhook_secret: secret("RAZORPAY_WEBHOOK_SECRET"),
            billing_success_url,
            billing_cancel_url,
            app_base_url,
            default_currency: get("BILLING_CURRENCY")
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        }
    }

    /// Validate payment configuration
    ///
    /// Missing credentials are not an error here: providers can be
    /// configured later through the settings store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, url) in [
            ("APP_BASE_URL", &self.app_base_url),
            ("BILLING_SUCCESS_URL", &self.billing_success_url),
            ("BILLING_CANCEL_URL", &self.billing_cancel_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidUrl(name));
            }
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
