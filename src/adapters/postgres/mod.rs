//! PostgreSQL adapters - Database implementations for billing ports.
//!
//! - `PostgresSubscriptionLedger` - Transactional checkout and transitions
//! - `PostgresBillingReader` - Plan, status and entitlement queries
//! - `PostgresWebhookEventLog` - Idempotent webhook log
//! - `PostgresSettingsStore` - Admin payment settings

mod billing_reader;
mod rows;
mod settings_store;
mod subscription_ledger;
mod webhook_event_log;

pub use billing_reader::PostgresBillingReader;
pub use settings_store::PostgresSettingsStore;
pub use subscription_ledger::PostgresSubscriptionLedger;
pub use webhook_event_log::PostgresWebhookEventLog;
