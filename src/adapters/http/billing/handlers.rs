//! HTTP handlers for billing endpoints.
//!
//! These handlers connect axum routes to the application layer handlers.
//! Webhook handlers take the body as raw `Bytes` because provider
//! signatures are computed over the exact bytes sent.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::RequireAuth;
use crate::application::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, HandleProviderWebhookCommand,
    HandleProviderWebhookHandler, SettingsResolver, StartCheckoutCommand, StartCheckoutHandler,
    SubscriptionTransitions, VerifyRazorpayPaymentCommand, VerifyRazorpayPaymentHandler,
};
use crate::domain::billing::{BillingError, BillingInterval, Correlation, PaymentProviderKind};
use crate::domain::foundation::{PlanId, SubscriptionId, TransactionId};
use crate::ports::{
    BillingReader, PaymentSettingsStore, ProviderClientFactory, SubscriptionLedger,
    WebhookEventLog,
};

use super::dto::{
    CheckoutRequest, CheckoutResponse, ErrorResponse, SubscriptionStatusResponse,
    VerifyRazorpayRequest, VerifyResponse, WebhookAck,
};

/// Header carrying Stripe's `t=...,v1=...` signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";
/// Header carrying Razorpay's hex HMAC of the body.
pub const RAZORPAY_SIGNATURE_HEADER: &str = "x-razorpay-signature";
/// Header carrying Razorpay's delivery id.
pub const RAZORPAY_EVENT_ID_HEADER: &str = "x-razorpay-event-id";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for billing routes.
///
/// Cloned per request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub reader: Arc<dyn BillingReader>,
    pub ledger: Arc<dyn SubscriptionLedger>,
    pub event_log: Arc<dyn WebhookEventLog>,
    pub settings: Arc<SettingsResolver>,
    pub clients: Arc<dyn ProviderClientFactory>,
    pub transitions: Arc<SubscriptionTransitions>,
}

impl BillingAppState {
    pub fn new(
        reader: Arc<dyn BillingReader>,
        ledger: Arc<dyn SubscriptionLedger>,
        event_log: Arc<dyn WebhookEventLog>,
        settings: Arc<SettingsResolver>,
        clients: Arc<dyn ProviderClientFactory>,
    ) -> Self {
        let transitions = Arc::new(SubscriptionTransitions::new(ledger.clone()));
        Self {
            reader,
            ledger,
            event_log,
            settings,
            clients,
            transitions,
        }
    }

    /// Builds the state with a fresh resolver over `store`.
    pub fn with_settings_store(
        reader: Arc<dyn BillingReader>,
        ledger: Arc<dyn SubscriptionLedger>,
        event_log: Arc<dyn WebhookEventLog>,
        store: Arc<dyn PaymentSettingsStore>,
        env: crate::config::PaymentConfig,
        clients: Arc<dyn ProviderClientFactory>,
    ) -> Self {
        let settings = Arc::new(SettingsResolver::new(store, env));
        Self::new(reader, ledger, event_log, settings, clients)
    }

    pub fn start_checkout_handler(&self) -> StartCheckoutHandler {
        StartCheckoutHandler::new(
            self.reader.clone(),
            self.ledger.clone(),
            self.settings.clone(),
            self.clients.clone(),
        )
    }

    pub fn status_handler(&self) -> GetSubscriptionStatusHandler {
        GetSubscriptionStatusHandler::new(self.reader.clone())
    }

    pub fn verify_razorpay_handler(&self) -> VerifyRazorpayPaymentHandler {
        VerifyRazorpayPaymentHandler::new(
            self.reader.clone(),
            self.settings.clone(),
            self.transitions.clone(),
        )
    }

    pub fn webhook_handler(&self) -> HandleProviderWebhookHandler {
        HandleProviderWebhookHandler::new(
            self.settings.clone(),
            self.event_log.clone(),
            self.transitions.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /checkout - Start a checkout with the chosen or default provider
pub async fn start_checkout(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BillingApiError> {
    let Json(request) = body.map_err(|e| BillingError::invalid_request(e.body_text()))?;

    let plan_id = request
        .plan_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| BillingError::invalid_request("planId is required"))?
        .parse::<PlanId>()
        .map_err(|_| BillingError::invalid_request("planId must be a valid id"))?;
    let billing_interval = match request.billing_interval.as_deref() {
        Some(raw) => raw.parse::<BillingInterval>()?,
        None => BillingInterval::default(),
    };
    let provider = request
        .provider
        .as_deref()
        .map(str::parse::<PaymentProviderKind>)
        .transpose()?;

    let cmd = StartCheckoutCommand {
        user_id: user.id,
        email: user.email,
        plan_id,
        billing_interval,
        provider,
    };
    let result = state.start_checkout_handler().handle(cmd).await?;

    Ok(Json(CheckoutResponse::from(result)))
}

/// GET /status - The caller's latest subscription
pub async fn get_status(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let query = GetSubscriptionStatusQuery { user_id: user.id };
    let result = state.status_handler().handle(query).await?;
    Ok(Json(SubscriptionStatusResponse::from(result)))
}

/// POST /razorpay/verify - Confirm a payment reported by Razorpay checkout
pub async fn verify_razorpay_payment(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    body: Result<Json<VerifyRazorpayRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BillingApiError> {
    let Json(request) = body.map_err(|e| BillingError::invalid_request(e.body_text()))?;
    let invalid = || BillingError::invalid_request("Invalid verification payload");

    let subscription_id = request
        .subscription_id
        .as_deref()
        .and_then(|s| s.parse::<SubscriptionId>().ok())
        .ok_or_else(invalid)?;
    let transaction_id = request
        .transaction_id
        .and_then(|s| TransactionId::new(s).ok())
        .ok_or_else(invalid)?;
    let (order_id, payment_id, signature) =
        match (request.order_id, request.payment_id, request.signature) {
            (Some(o), Some(p), Some(s)) if !s.trim().is_empty() => (o, p, s),
            _ => return Err(invalid().into()),
        };

    let cmd = VerifyRazorpayPaymentCommand {
        user_id: user.id,
        correlation: Correlation {
            subscription_id,
            transaction_id,
        },
        order_id,
        payment_id,
        signature,
    };
    state.verify_razorpay_handler().handle(cmd).await?;

    Ok(Json(VerifyResponse { success: true }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoints (no session; signature verified)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhook/stripe - Stripe event delivery
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = HandleProviderWebhookCommand {
        provider: PaymentProviderKind::Stripe,
        payload: body.to_vec(),
        signature: header_value(&headers, STRIPE_SIGNATURE_HEADER),
        event_id: None,
    };
    state.webhook_handler().handle(cmd).await?;
    Ok(Json(WebhookAck { received: true }))
}

/// POST /webhook/razorpay - Razorpay event delivery
pub async fn handle_razorpay_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = HandleProviderWebhookCommand {
        provider: PaymentProviderKind::Razorpay,
        payload: body.to_vec(),
        signature: header_value(&headers, RAZORPAY_SIGNATURE_HEADER),
        event_id: header_value(&headers, RAZORPAY_EVENT_ID_HEADER),
    };
    state.webhook_handler().handle(cmd).await?;
    Ok(Json(WebhookAck { received: true }))
}

/// Non-UTF8 values count as absent.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::ValidationError> for BillingApiError {
    fn from(err: crate::domain::foundation::ValidationError) -> Self {
        Self(BillingError::from(err))
    }
}

impl BillingApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BillingError::InvalidRequest(_)
            | BillingError::OrgPlanRequiresSales
            | BillingError::AlreadySubscribed
            | BillingError::ProviderNotConfigured { .. }
            | BillingError::WebhookNotConfigured(_)
            | BillingError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            BillingError::PlanNotFound(_) | BillingError::SubscriptionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            BillingError::Conflict(_) | BillingError::InvalidState { .. } => StatusCode::CONFLICT,
            BillingError::Checkout(_) | BillingError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            BillingError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "Billing request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorResponse::new(self.0.code().to_string(), message);
        (status, Json(body)).into_response()
    }
}
