//! Stripe Checkout gateway.
//!
//! Opens one-time `mode=payment` Checkout Sessions with inline price data.
//! The subscription and transaction ids are written to both the session and
//! payment intent metadata; webhooks read them back to correlate.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::api_types::{stripe_error, StripeCheckoutSession};
use crate::domain::billing::events::{SUBSCRIPTION_ID_KEY, TRANSACTION_ID_KEY};
use crate::domain::billing::PaymentProviderKind;
use crate::ports::{CheckoutArtifact, CheckoutRequest, PaymentError, PaymentGateway};

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    secret_key: SecretString,

    /// Returned to the browser alongside the session.
    publishable_key: Option<String>,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(secret_key: SecretString, publishable_key: Option<String>) -> Self {
        Self {
            secret_key,
            publishable_key,
            api_base_url: STRIPE_API_BASE.to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// `PaymentGateway` backed by the Stripe REST API.
pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

/// Form-encoded parameters for `POST /v1/checkout/sessions`.
pub(crate) fn checkout_session_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let subscription_id = request.subscription_id.to_string();
    let transaction_id = request.transaction_id.to_string();

    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.to_lowercase(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.plan_name.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.amount.to_string(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (format!("metadata[{}]", SUBSCRIPTION_ID_KEY), subscription_id.clone()),
        (format!("metadata[{}]", TRANSACTION_ID_KEY), transaction_id.clone()),
        (
            "metadata[billingInterval]".to_string(),
            request.billing_interval.as_str().to_string(),
        ),
        (
            format!("payment_intent_data[metadata][{}]", SUBSCRIPTION_ID_KEY),
            subscription_id,
        ),
        (
            format!("payment_intent_data[metadata][{}]", TRANSACTION_ID_KEY),
            transaction_id,
        ),
    ];

    if let Some(description) = request.plan_description.as_deref().filter(|d| !d.is_empty()) {
        params.push((
            "line_items[0][price_data][product_data][description]".to_string(),
            description.to_string(),
        ));
    }
    if let Some(email) = &request.customer_email {
        params.push(("customer_email".to_string(), email.clone()));
    }

    params
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::Stripe
    }

    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutArtifact, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.secret_key.expose_secret(), Option::<&str>::None)
            .form(&checkout_session_form(request))
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = stripe_error(status.as_u16(), &body);
            tracing::warn!(
                subscription_id = %request.subscription_id,
                status = status.as_u16(),
                error = %error,
                "Stripe rejected checkout session"
            );
            return Err(error);
        }

        let session: StripeCheckoutSession = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        tracing::info!(
            subscription_id = %request.subscription_id,
            session_id = %session.id,
            "Stripe checkout session created"
        );

        Ok(CheckoutArtifact::Stripe {
            session_id: session.id,
            url: session.url,
            publishable_key: self.config.publishable_key.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::BillingInterval;
    use crate::domain::foundation::{SubscriptionId, TransactionId};

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            subscription_id: SubscriptionId::new(),
            transaction_id: TransactionId::new("txnABC").unwrap(),
            plan_name: "Premium".to_string(),
            plan_description: Some("All mock exams".to_string()),
            billing_interval: BillingInterval::Yearly,
            amount: 4999,
            currency: "INR".to_string(),
            customer_email: Some("a@example.com".to_string()),
            success_url: "https://app.test/billing-status?status=success".to_string(),
            cancel_url: "https://app.test/billing-status?status=cancelled".to_string(),
        }
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_defaults_to_stripe_api() {
        let config = StripeConfig::new(SecretString::new("sk_test".to_string()), None);
        assert_eq!(config.api_base_url, "https://api.stripe.com");
    }

    #[test]
    fn config_with_base_url() {
        let config = StripeConfig::new(SecretString::new("sk_test".to_string()), None)
            .with_base_url("http://localhost:12111");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout Form Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn form_is_one_time_payment_with_lowercase_currency() {
        let params = checkout_session_form(&request());
        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(param(&params, "line_items[0][price_data][currency]"), Some("inr"));
        assert_eq!(param(&params, "line_items[0][price_data][unit_amount]"), Some("4999"));
        assert_eq!(param(&params, "line_items[0][quantity]"), Some("1"));
    }

    #[test]
    fn form_carries_correlation_metadata_on_session_and_intent() {
        let req = request();
        let params = checkout_session_form(&req);
        let sub = req.subscription_id.to_string();

        assert_eq!(param(&params, "metadata[subscriptionId]"), Some(sub.as_str()));
        assert_eq!(param(&params, "metadata[transactionId]"), Some("txnABC"));
        assert_eq!(param(&params, "metadata[billingInterval]"), Some("yearly"));
        assert_eq!(
            param(&params, "payment_intent_data[metadata][subscriptionId]"),
            Some(sub.as_str())
        );
        assert_eq!(
            param(&params, "payment_intent_data[metadata][transactionId]"),
            Some("txnABC")
        );
    }

    #[test]
    fn form_omits_absent_email_and_description() {
        let mut req = request();
        req.customer_email = None;
        req.plan_description = None;
        let params = checkout_session_form(&req);

        assert!(param(&params, "customer_email").is_none());
        assert!(param(&params, "line_items[0][price_data][product_data][description]").is_none());
    }
}
