//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, time, error types, the state machine trait and
//! the authenticated-caller types used across the billing engine.

mod auth;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{PlanId, SubscriptionId, TransactionId, UserId, TRANSACTION_ID_LEN};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
