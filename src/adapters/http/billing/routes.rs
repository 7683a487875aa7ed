//! Axum router configuration for billing endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::handlers::{
    get_status, handle_razorpay_webhook, handle_stripe_webhook, start_checkout,
    verify_razorpay_payment, BillingAppState,
};
use crate::adapters::http::middleware::{auth_middleware, AuthState};

/// Routes acting on the caller's own subscription.
///
/// # Routes
/// - `POST /checkout` - Start a checkout
/// - `GET /status` - Latest subscription
/// - `POST /razorpay/verify` - Confirm a Razorpay payment from the browser
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/checkout", post(start_checkout))
        .route("/status", get(get_status))
        .route("/razorpay/verify", post(verify_razorpay_payment))
}

/// Provider webhook routes.
///
/// Kept apart from the user routes because providers authenticate with a
/// signature, not a session.
///
/// # Routes
/// - `POST /webhook/stripe`
/// - `POST /webhook/razorpay`
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/webhook/stripe", post(handle_stripe_webhook))
        .route("/webhook/razorpay", post(handle_razorpay_webhook))
}

/// The complete billing router, ready to nest under `/api/billing`.
///
/// # Example
///
/// ```ignore
/// let app = Router::new().nest("/api/billing", billing_router(state, validator));
/// ```
pub fn billing_router(state: BillingAppState, auth: AuthState) -> Router {
    Router::new()
        .merge(billing_routes().route_layer(middleware::from_fn_with_state(auth, auth_middleware)))
        .merge(webhook_routes())
        .with_state(state)
}
