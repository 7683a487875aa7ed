//! Mock payment gateways for tests and local runs.
//!
//! Supports error injection and records every checkout request so tests
//! can assert on what would have been sent to the provider.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::billing::{BillingError, PaymentProviderKind};
use crate::ports::{
    CheckoutArtifact, CheckoutRequest, PaymentError, PaymentGateway, ProviderClientFactory,
    ProviderCredentials,
};

/// Publishable key returned in mock Stripe artifacts.
pub const MOCK_PUBLISHABLE_KEY: &str = "pk_test_mock";

#[derive(Debug, Default)]
struct MockState {
    requests: Vec<CheckoutRequest>,
    next_error: Option<PaymentError>,
}

/// Gateway that fabricates provider artifacts without network calls.
#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
    kind: PaymentProviderKind,
    state: Arc<Mutex<MockState>>,
}

impl MockPaymentGateway {
    pub fn new(kind: PaymentProviderKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Makes the next `create_checkout` call fail with `error`.
    pub async fn fail_next(&self, error: PaymentError) {
        self.state.lock().await.next_error = Some(error);
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<CheckoutRequest> {
        self.state.lock().await.requests.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn kind(&self) -> PaymentProviderKind {
        self.kind
    }

    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutArtifact, PaymentError> {
        let mut state = self.state.lock().await;
        state.requests.push(request.clone());
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        let n = state.requests.len();

        Ok(match self.kind {
            PaymentProviderKind::Stripe => {
                let session_id = format!("cs_test_mock_{}", n);
                CheckoutArtifact::Stripe {
                    url: Some(format!("https://checkout.stripe.com/c/pay/{}", session_id)),
                    session_id,
                    publishable_key: Some(MOCK_PUBLISHABLE_KEY.to_string()),
                }
            }
            PaymentProviderKind::Razorpay => {
                let order_id = format!("order_mock_{}", n);
                CheckoutArtifact::Razorpay {
                    order: json!({
                        "id": order_id,
                        "entity": "order",
                        "amount": request.amount,
                        "currency": request.currency,
                        "receipt": format!("sub_{}", request.subscription_id),
                        "status": "created",
                    }),
                    order_id,
                    key_id: "rzp_test_mock".to_string(),
                }
            }
        })
    }
}

/// Factory handing out one mock gateway per provider.
///
/// Still requires credentials to resolve, so configuration errors surface
/// the same way they do with real clients.
#[derive(Debug, Clone)]
pub struct MockProviderFactory {
    pub stripe: MockPaymentGateway,
    pub razorpay: MockPaymentGateway,
}

impl MockProviderFactory {
    pub fn new() -> Self {
        Self {
            stripe: MockPaymentGateway::new(PaymentProviderKind::Stripe),
            razorpay: MockPaymentGateway::new(PaymentProviderKind::Razorpay),
        }
    }
}

impl Default for MockProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderClientFactory for MockProviderFactory {
    fn client(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<Arc<dyn PaymentGateway>, BillingError> {
        Ok(match credentials.provider() {
            PaymentProviderKind::Stripe => Arc::new(self.stripe.clone()),
            PaymentProviderKind::Razorpay => Arc::new(self.razorpay.clone()),
        })
    }
}
