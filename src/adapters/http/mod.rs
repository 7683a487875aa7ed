//! HTTP adapters - REST API implementations.

pub mod billing;
pub mod middleware;

pub use billing::{billing_router, BillingAppState};
pub use middleware::{auth_middleware, AuthState, RequireAuth};
