//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{
    // Commands
    HandleProviderWebhookCommand,
    HandleProviderWebhookHandler,
    HandleProviderWebhookResult,
    StartCheckoutCommand,
    StartCheckoutHandler,
    StartCheckoutResult,
    SubscriptionTransitions,
    VerifyRazorpayPaymentCommand,
    VerifyRazorpayPaymentHandler,
    // Queries
    GetSubscriptionStatusHandler,
    GetSubscriptionStatusQuery,
    GetSubscriptionStatusResult,
};
