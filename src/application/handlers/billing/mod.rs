//! Billing handlers.
//!
//! ## Commands
//! - Starting a checkout
//! - Processing provider webhooks
//! - Verifying a client-reported Razorpay payment
//!
//! ## Queries
//! - Get the caller's subscription status
//!
//! Activation and failure go through [`SubscriptionTransitions`] from every
//! entry point.

mod get_subscription_status;
mod handle_provider_webhook;
mod start_checkout;
mod transitions;
mod verify_razorpay_payment;

// Commands
pub use handle_provider_webhook::{
    HandleProviderWebhookCommand, HandleProviderWebhookHandler, HandleProviderWebhookResult,
};
pub use start_checkout::{StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult};
pub use transitions::SubscriptionTransitions;
pub use verify_razorpay_payment::{
    VerifyRazorpayPaymentCommand, VerifyRazorpayPaymentHandler, INVALID_RAZORPAY_SIGNATURE,
};

// Queries
pub use get_subscription_status::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, GetSubscriptionStatusResult,
};
