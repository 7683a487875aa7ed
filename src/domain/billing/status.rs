//! Subscription and transaction status state machines.
//!
//! A subscription is opened `pending` by checkout and leaves it exactly once,
//! to `active` on proof of payment or `cancelled` on failure/supersession.
//! The remaining statuses belong to the renewal lifecycle owned elsewhere but
//! still count toward the one-entitling-subscription-per-user rule.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, ValidationError};

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Checkout opened, awaiting proof of payment. Grants nothing.
    Pending,

    /// Trial period. Entitling.
    Trial,

    /// Paid and current.
    Active,

    /// Renewal payment failed, still inside grace.
    PastDue,

    /// Temporarily suspended by the user.
    Paused,

    /// Failed, superseded, or ended. History only.
    Cancelled,
}

impl SubscriptionStatus {
    /// Statuses that count toward the at-most-one rule.
    pub const ENTITLING: [SubscriptionStatus; 4] = [
        SubscriptionStatus::Active,
        SubscriptionStatus::Trial,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Paused,
    ];

    /// Returns true if a subscription in this status blocks a new checkout.
    pub fn is_entitling(&self) -> bool {
        Self::ENTITLING.contains(self)
    }

    /// Stable storage/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubscriptionStatus::Pending),
            "trial" => Ok(SubscriptionStatus::Trial),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "paused" => Ok(SubscriptionStatus::Paused),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Cancelled],
            Trial => vec![Active, Cancelled],
            Active => vec![PastDue, Paused, Cancelled],
            PastDue => vec![Active, Cancelled],
            Paused => vec![Active, Cancelled],
            // Late proof of payment for a checkout that was already written off
            Cancelled => vec![Active],
        }
    }
}

/// Payment transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Failed,
}

impl TransactionStatus {
    /// Stable storage/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Paid => "paid",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "paid" => Ok(TransactionStatus::Paid),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "transaction_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for TransactionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            TransactionStatus::Pending => vec![TransactionStatus::Paid, TransactionStatus::Failed],
            TransactionStatus::Failed => vec![TransactionStatus::Paid],
            TransactionStatus::Paid => vec![],
        }
    }
}
