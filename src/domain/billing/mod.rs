//! Billing domain module.
//!
//! Subscription lifecycle from checkout to activation or failure, the plans
//! it sells, and verification of what payment providers tell us.
//!
//! # Module Structure
//!
//! - `plan` - Catalog entries and charge computation
//! - `interval` - Billing intervals and period arithmetic
//! - `status` - Subscription and transaction state machines
//! - `subscription` - Subscription aggregate
//! - `transaction` - Payment transaction entity
//! - `lifecycle` - Paired activate/fail transitions
//! - `webhook_verifier` - Provider signature checks
//! - `events` - Normalized provider webhook events

mod entitlement;
mod errors;
pub mod events;
mod interval;
mod lifecycle;
mod plan;
mod proof;
mod provider;
mod status;
mod subscription;
mod transaction;
pub mod webhook_verifier;

pub use entitlement::{Entitlement, EntitlementStatus};
pub use errors::BillingError;
pub use events::{Correlation, EventKind, ProviderEvent, WebhookDelivery};
pub use interval::BillingInterval;
pub use lifecycle::{apply_activation, apply_failure, Activation};
pub use plan::{Plan, PlanType, DEFAULT_CURRENCY};
pub use proof::PaymentProof;
pub use provider::PaymentProviderKind;
pub use status::{SubscriptionStatus, TransactionStatus};
pub use subscription::{Subscription, TransitionOutcome, SUPERSEDED_REASON};
pub use transaction::PaymentTransaction;
