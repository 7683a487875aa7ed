//! HTTP adapter for billing endpoints.
//!
//! - `POST /checkout` - Start a checkout
//! - `GET /status` - Caller's latest subscription
//! - `POST /razorpay/verify` - Confirm a Razorpay payment
//! - `POST /webhook/stripe` - Stripe webhooks
//! - `POST /webhook/razorpay` - Razorpay webhooks

pub mod dto;
mod handlers;
mod routes;

pub use handlers::{
    BillingApiError, BillingAppState, RAZORPAY_EVENT_ID_HEADER, RAZORPAY_SIGNATURE_HEADER,
    STRIPE_SIGNATURE_HEADER,
};
pub use routes::{billing_router, billing_routes, webhook_routes};
