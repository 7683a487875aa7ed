//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, auth)
//! - `billing` - Subscription lifecycle, plans, and payment verification

pub mod billing;
pub mod foundation;
