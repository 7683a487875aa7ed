//! Exam Billing - Subscription lifecycle engine
//!
//! Takes a user from "wants to pay" to "entitled" through Stripe or
//! Razorpay: opens checkouts, verifies provider webhooks and client
//! callbacks, and applies the activate/fail transitions that keep the
//! user's entitlement consistent with their subscriptions.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
