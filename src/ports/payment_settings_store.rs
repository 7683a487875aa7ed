//! Payment settings port.
//!
//! The admin-managed key-value store may hold each value either as a bare
//! JSON string or as `{"value": "..."}`. That ambiguity is resolved here,
//! once, into [`StoredPaymentSettings`]; nothing downstream sees raw values.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;

use crate::domain::billing::PaymentProviderKind;
use crate::domain::foundation::DomainError;

/// Keys the billing engine reads from the settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    PaymentProvider,
    StripePublishableKey,
    StripeSecretKey,
    StripeWebhookSecret,
    RazorpayKeyId,
    RazorpayKeySecret,
    RazorpayWebhookSecret,
    BillingSuccessUrl,
    BillingCancelUrl,
}

impl SettingKey {
    pub const ALL: [SettingKey; 9] = [
        SettingKey::PaymentProvider,
        SettingKey::StripePublishableKey,
        SettingKey::StripeSecretKey,
        SettingKey::StripeWebhookSecret,
        SettingKey::RazorpayKeyId,
        SettingKey::RazorpayKeySecret,
        SettingKey::RazorpayWebhookSecret,
        SettingKey::BillingSuccessUrl,
        SettingKey::BillingCancelUrl,
    ];

    /// Storage key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::PaymentProvider => "paymentProvider",
            SettingKey::StripePublishableKey => "stripePublishableKey",
            SettingKey::StripeSecretKey => "stripeSecretKey",
            SettingKey::StripeWebhookSecret => "stripeWebhookSecret",
            SettingKey::RazorpayKeyId => "razorpayKeyId",
            SettingKey::RazorpayKeySecret => "razorpayKeySecret",
            SettingKey::RazorpayWebhookSecret => "razorpayWebhookSecret",
            SettingKey::BillingSuccessUrl => "billingSuccessUrl",
            SettingKey::BillingCancelUrl => "billingCancelUrl",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// Collapses a stored value to its string, or `None` when unusable.
///
/// Accepts `"text"` and `{"value": "text"}`. Blank strings count as absent.
pub fn normalize_setting_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("value").and_then(Value::as_str)?,
        _ => return None,
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Typed view of what the settings store holds. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct StoredPaymentSettings {
    pub payment_provider: Option<PaymentProviderKind>,
    pub stripe_publishable_key: Option<String>,
    pub stripe_secret_key: Option<SecretString>,
    pub stripe_webhook_secret: Option<SecretString>,
    pub razorpay_key_id: Option<String>,
    pub razorpay_key_secret: Option<SecretString>,
    pub razorpay_webhook_secret: Option<SecretString>,
    pub billing_success_url: Option<String>,
    pub billing_cancel_url: Option<String>,
}

impl StoredPaymentSettings {
    /// Builds the typed record from raw `(key, value)` rows.
    ///
    /// Unknown keys and unusable values are skipped. An unrecognised
    /// provider name is treated as unset.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let mut settings = Self::default();
        for (key, value) in entries {
            let (Some(key), Some(text)) = (SettingKey::from_key(key), normalize_setting_value(value))
            else {
                continue;
            };
            match key {
                SettingKey::PaymentProvider => settings.payment_provider = text.parse().ok(),
                SettingKey::StripePublishableKey => settings.stripe_publishable_key = Some(text),
                SettingKey::StripeSecretKey => settings.stripe_secret_key = Some(SecretString::new(text)),
                SettingKey::StripeWebhookSecret => settings.stripe_webhook_secret = Some(SecretString::new(text)),
                SettingKey::RazorpayKeyId => settings.razorpay_key_id = Some(text),
                SettingKey::RazorpayKeySecret => settings.razorpay_key_secret = Some(SecretString::new(text)),
                SettingKey::RazorpayWebhookSecret => {
                    settings.razorpay_webhook_secret = Some(SecretString::new(text))
                }
                SettingKey::BillingSuccessUrl => settings.billing_success_url = Some(text),
                SettingKey::BillingCancelUrl => settings.billing_cancel_url = Some(text),
            }
        }
        settings
    }
}

/// Read access to admin-managed payment settings.
#[async_trait]
pub trait PaymentSettingsStore: Send + Sync {
    /// Loads the current settings. Missing keys are `None`, not errors.
    async fn load(&self) -> Result<StoredPaymentSettings, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn normalizes_bare_string_and_wrapped_value() {
        assert_eq!(normalize_setting_value(&json!("sk_test")), Some("sk_test".to_string()));
        assert_eq!(
            normalize_setting_value(&json!({"value": "sk_test"})),
            Some("sk_test".to_string())
        );
    }

    #[test]
    fn blank_and_non_string_values_are_absent() {
        assert_eq!(normalize_setting_value(&json!("   ")), None);
        assert_eq!(normalize_setting_value(&json!(42)), None);
        assert_eq!(normalize_setting_value(&json!({"value": 42})), None);
        assert_eq!(normalize_setting_value(&Value::Null), None);
    }

    #[test]
    fn builds_typed_record_from_rows() {
        let provider = json!({"value": "razorpay"});
        let secret = json!("rzp_secret");
        let unknown = json!("ignored");
        let rows = vec![
            ("paymentProvider", &provider),
            ("razorpayKeySecret", &secret),
            ("siteTitle", &unknown),
        ];

        let settings = StoredPaymentSettings::from_entries(rows);

        assert_eq!(settings.payment_provider, Some(PaymentProviderKind::Razorpay));
        assert_eq!(
            settings.razorpay_key_secret.as_ref().map(|s| s.expose_secret().as_str()),
            Some("rzp_secret")
        );
        assert!(settings.stripe_secret_key.is_none());
    }

    #[test]
    fn unknown_provider_name_is_unset() {
        let provider = json!("paypal");
        let settings = StoredPaymentSettings::from_entries(vec![("paymentProvider", &provider)]);
        assert!(settings.payment_provider.is_none());
    }

    #[test]
    fn every_key_round_trips_through_its_name() {
        for key in SettingKey::ALL {
            assert_eq!(SettingKey::from_key(key.as_str()), Some(key));
        }
    }
}
