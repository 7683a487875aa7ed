//! HTTP DTOs for billing endpoints.
//!
//! Field names are camelCase on the wire. Request ids arrive as strings and
//! are parsed in the handlers so a malformed id surfaces as `INVALID_REQUEST`
//! instead of a framework rejection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{GetSubscriptionStatusResult, StartCheckoutResult};
use crate::domain::billing::{BillingInterval, PaymentProviderKind, SubscriptionStatus};
use crate::ports::{CheckoutArtifact, SubscriptionStatusView};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /checkout`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub plan_id: Option<String>,
    /// Defaults to monthly.
    #[serde(default)]
    pub billing_interval: Option<String>,
    /// Overrides the platform default provider.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Body of `POST /razorpay/verify`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRazorpayRequest {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response of `POST /checkout`, shaped per provider.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CheckoutResponse {
    #[serde(rename_all = "camelCase")]
    Stripe {
        provider: PaymentProviderKind,
        session_id: String,
        url: Option<String>,
        subscription_id: String,
        transaction_id: String,
        publishable_key: Option<String>,
        amount: i64,
        currency: String,
    },
    #[serde(rename_all = "camelCase")]
    Razorpay {
        provider: PaymentProviderKind,
        order: Value,
        key_id: String,
        subscription_id: String,
        transaction_id: String,
        amount: i64,
        currency: String,
    },
}

impl From<StartCheckoutResult> for CheckoutResponse {
    fn from(result: StartCheckoutResult) -> Self {
        let subscription_id = result.subscription_id.to_string();
        let transaction_id = result.transaction_id.to_string();
        match result.artifact {
            CheckoutArtifact::Stripe {
                session_id,
                url,
                publishable_key,
            } => CheckoutResponse::Stripe {
                provider: PaymentProviderKind::Stripe,
                session_id,
                url,
                subscription_id,
                transaction_id,
                publishable_key,
                amount: result.amount,
                currency: result.currency,
            },
            CheckoutArtifact::Razorpay { order, key_id, .. } => CheckoutResponse::Razorpay {
                provider: PaymentProviderKind::Razorpay,
                order,
                key_id,
                subscription_id,
                transaction_id,
                amount: result.amount,
                currency: result.currency,
            },
        }
    }
}

/// Response of `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatusResponse {
    /// `null` when the user never started a checkout.
    pub subscription: Option<SubscriptionStatusBody>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusBody {
    pub id: String,
    pub status: SubscriptionStatus,
    pub billing_interval: BillingInterval,
    /// ISO 8601
    pub current_period_start: Option<String>,
    /// ISO 8601
    pub current_period_end: Option<String>,
    pub auto_renew: bool,
    pub plan_name: String,
    pub plan_slug: String,
    pub currency: String,
}

impl From<SubscriptionStatusView> for SubscriptionStatusBody {
    fn from(view: SubscriptionStatusView) -> Self {
        Self {
            id: view.id.to_string(),
            status: view.status,
            billing_interval: view.billing_interval,
            current_period_start: view
                .current_period_start
                .map(|t| t.as_datetime().to_rfc3339()),
            current_period_end: view.current_period_end.map(|t| t.as_datetime().to_rfc3339()),
            auto_renew: view.auto_renew,
            plan_name: view.plan_name,
            plan_slug: view.plan_slug,
            currency: view.currency,
        }
    }
}

impl From<GetSubscriptionStatusResult> for SubscriptionStatusResponse {
    fn from(result: GetSubscriptionStatusResult) -> Self {
        Self {
            subscription: result.subscription.map(SubscriptionStatusBody::from),
        }
    }
}

/// Response of `POST /razorpay/verify`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
}

/// Acknowledgement returned to providers once a delivery is authenticated.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Error body: `{"error": CODE, "message": text}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code.
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
