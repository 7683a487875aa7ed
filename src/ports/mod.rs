//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `SubscriptionLedger` - The only write path for subscription, transaction and entitlement state
//! - `BillingReader` - Plan lookup and subscription status queries
//! - `WebhookEventLog` - Provider event idempotency and audit trail
//! - `PaymentSettingsStore` - Admin-managed provider credentials and URLs
//!
//! ## Provider Ports
//!
//! - `PaymentGateway` - Checkout creation with one provider
//! - `ProviderClientFactory` - Builds gateways from resolved credentials
//!
//! ## Session Ports
//!
//! - `SessionValidator` - Bearer token to caller identity

mod billing_reader;
mod payment_gateway;
mod payment_settings_store;
mod provider_client_factory;
mod session_validator;
mod subscription_ledger;
mod webhook_event_log;

pub use billing_reader::{BillingReader, SubscriptionStatusView};
pub use payment_gateway::{
    CheckoutArtifact, CheckoutRequest, PaymentError, PaymentErrorCode, PaymentGateway,
};
pub use payment_settings_store::{
    normalize_setting_value, PaymentSettingsStore, SettingKey, StoredPaymentSettings,
};
pub use provider_client_factory::{ProviderClientFactory, ProviderCredentials};
pub use session_validator::SessionValidator;
pub use subscription_ledger::{CheckoutOpened, SubscriptionLedger};
pub use webhook_event_log::{RecordOutcome, WebhookEventLog, WebhookEventRecord};
