//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing engine to external systems:
//! - `postgres` - sqlx storage for the ledger, reader, event log and settings
//! - `memory` - In-process storage for tests and local runs
//! - `stripe` / `razorpay` - Provider REST clients
//! - `provider_factory` - Cached provider client construction
//! - `auth` - Session token validation
//! - `http` - axum routes

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
mod provider_factory;
pub mod razorpay;
pub mod stripe;

pub use auth::{JwtSessionValidator, MockSessionValidator};
pub use http::{billing_router, BillingAppState};
pub use memory::{InMemoryBillingStore, InMemorySettingsStore};
pub use postgres::{
    PostgresBillingReader, PostgresSettingsStore, PostgresSubscriptionLedger,
    PostgresWebhookEventLog,
};
pub use provider_factory::CachingProviderFactory;
pub use razorpay::RazorpayGateway;
pub use stripe::StripeGateway;
