//! Payment gateway port - creates provider checkout artifacts.
//!
//! One implementation per provider. Webhook verification is not part of this
//! port; it needs only the signing secret and lives in the domain.
//!
//! Checkout creation is never retried by the engine: a second order/session
//! request after a timeout could leave two live payment attempts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::billing::{BillingError, BillingInterval, PaymentProviderKind};
use crate::domain::foundation::{SubscriptionId, TransactionId};

/// Everything a provider needs to open a checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub subscription_id: SubscriptionId,
    pub transaction_id: TransactionId,
    pub plan_name: String,
    pub plan_description: Option<String>,
    pub billing_interval: BillingInterval,
    /// Minor units.
    pub amount: i64,
    /// ISO currency code as stored on the plan (upper case).
    pub currency: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Redirectable artifact returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutArtifact {
    /// Hosted checkout session.
    Stripe {
        session_id: String,
        url: Option<String>,
        publishable_key: Option<String>,
    },
    /// Order completed in the browser with the public key id.
    Razorpay {
        order_id: String,
        order: Value,
        key_id: String,
    },
}

impl CheckoutArtifact {
    pub fn provider(&self) -> PaymentProviderKind {
        match self {
            CheckoutArtifact::Stripe { .. } => PaymentProviderKind::Stripe,
            CheckoutArtifact::Razorpay { .. } => PaymentProviderKind::Razorpay,
        }
    }
}

/// Creates checkout artifacts with one provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Which provider this client talks to.
    fn kind(&self) -> PaymentProviderKind;

    /// Creates a hosted session or order for the request.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` on provider rejection or transport failure.
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutArtifact, PaymentError>;
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: PaymentErrorCode,

    pub message: String,

    /// Provider's own error code, when it sent one.
    pub provider_code: Option<String>,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for BillingError {
    fn from(err: PaymentError) -> Self {
        BillingError::checkout(err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Could not reach the provider.
    NetworkError,

    /// API key rejected.
    AuthenticationError,

    /// Provider rejected the request parameters.
    InvalidRequest,

    /// Provider-side failure.
    ProviderError,
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_error_becomes_checkout_error_with_provider_message() {
        let err: BillingError = PaymentError::invalid_request("amount must be at least 100")
            .with_provider_code("BAD_REQUEST_ERROR")
            .into();
        assert!(matches!(err, BillingError::Checkout(ref m) if m == "amount must be at least 100"));
    }

    #[test]
    fn payment_error_display_includes_code() {
        let err = PaymentError::network("connection reset");
        assert_eq!(err.to_string(), "network_error: connection reset");
    }

    #[test]
    fn artifact_reports_its_provider() {
        let artifact = CheckoutArtifact::Razorpay {
            order_id: "order_1".to_string(),
            order: Value::Null,
            key_id: "rzp_test".to_string(),
        };
        assert_eq!(artifact.provider(), PaymentProviderKind::Razorpay);
    }
}
