//! Razorpay Orders gateway.
//!
//! Creates an order the browser completes with Razorpay Checkout. The
//! subscription and transaction ids travel in the order `notes`, which
//! Razorpay copies onto the resulting payment entity.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::billing::events::{SUBSCRIPTION_ID_KEY, TRANSACTION_ID_KEY};
use crate::domain::billing::PaymentProviderKind;
use crate::ports::{
    CheckoutArtifact, CheckoutRequest, PaymentError, PaymentErrorCode, PaymentGateway,
};

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com";

/// Razorpay API configuration.
#[derive(Clone)]
pub struct RazorpayConfig {
    /// Public key id; also handed to the browser.
    key_id: String,
    key_secret: SecretString,
    api_base_url: String,
}

impl RazorpayConfig {
    pub fn new(key_id: impl Into<String>, key_secret: SecretString) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret,
            api_base_url: RAZORPAY_API_BASE.to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// `PaymentGateway` backed by the Razorpay Orders API.
pub struct RazorpayGateway {
    config: RazorpayConfig,
    http_client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

/// JSON body for `POST /v1/orders`.
pub(crate) fn order_body(request: &CheckoutRequest) -> Value {
    json!({
        "amount": request.amount,
        "currency": request.currency,
        "receipt": format!("sub_{}", request.subscription_id),
        "notes": {
            SUBSCRIPTION_ID_KEY: request.subscription_id.to_string(),
            TRANSACTION_ID_KEY: request.transaction_id.to_string(),
            "planName": request.plan_name,
        },
    })
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    error: RazorpayApiError,
}

#[derive(Debug, Deserialize)]
struct RazorpayApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Maps a failed Razorpay response to a `PaymentError`.
pub(crate) fn razorpay_error(status: u16, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<RazorpayErrorBody>(body).ok().map(|b| b.error);
    let message = parsed
        .as_ref()
        .and_then(|e| e.description.clone())
        .unwrap_or_else(|| format!("Razorpay API error (HTTP {})", status));
    let code = match status {
        401 => PaymentErrorCode::AuthenticationError,
        400 => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    let error = PaymentError::new(code, message);
    match parsed.and_then(|e| e.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::Razorpay
    }

    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutArtifact, PaymentError> {
        let url = format!("{}/v1/orders", self.config.api_base_url);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose_secret()))
            .json(&order_body(request))
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = razorpay_error(status.as_u16(), &body);
            tracing::warn!(
                subscription_id = %request.subscription_id,
                status = status.as_u16(),
                error = %error,
                "Razorpay rejected order"
            );
            return Err(error);
        }

        let order: Value = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Razorpay response: {}", e))
        })?;
        let order_id = order
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PaymentError::provider("Razorpay order response has no id"))?;

        tracing::info!(
            subscription_id = %request.subscription_id,
            order_id = %order_id,
            "Razorpay order created"
        );

        Ok(CheckoutArtifact::Razorpay {
            order_id,
            order,
            key_id: self.config.key_id.clone(),
        })
    }
}
