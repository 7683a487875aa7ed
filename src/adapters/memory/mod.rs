//! In-process adapters.
//!
//! Used by the test suites and for running the service without a database
//! or provider accounts.

mod billing_store;
mod mock_gateway;
mod settings_store;

pub use billing_store::{FaultPoint, InMemoryBillingStore};
pub use mock_gateway::{MockPaymentGateway, MockProviderFactory, MOCK_PUBLISHABLE_KEY};
pub use settings_store::InMemorySettingsStore;
