//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Payment settings are resolved here per request so admin changes apply
//! without a restart.

pub mod handlers;
mod settings_resolver;

pub use handlers::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, GetSubscriptionStatusResult,
    HandleProviderWebhookCommand, HandleProviderWebhookHandler, HandleProviderWebhookResult,
    StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult, SubscriptionTransitions,
    VerifyRazorpayPaymentCommand, VerifyRazorpayPaymentHandler,
};
pub use settings_resolver::{PaymentSettings, SettingsResolver};
