//! User entitlement projection.
//!
//! Denormalized onto the user record for fast authorization checks by the
//! rest of the platform. Written only by activation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{PaymentProof, PaymentProviderKind};
use crate::domain::foundation::{Timestamp, ValidationError};

/// Payment status stored on the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

impl EntitlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementStatus::Pending => "pending",
            EntitlementStatus::Paid => "paid",
            EntitlementStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for EntitlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntitlementStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EntitlementStatus::Pending),
            "paid" => Ok(EntitlementStatus::Paid),
            "refunded" => Ok(EntitlementStatus::Refunded),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown payment status '{}'", other),
            )),
        }
    }
}

/// The paid-user flag and its provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub is_paid_user: bool,
    pub payment_status: EntitlementStatus,
    pub paid_at: Option<Timestamp>,
    pub payment_provider: Option<PaymentProviderKind>,
    pub payment_id: Option<String>,
}

impl Entitlement {
    /// Entitlement granted by a settled payment.
    pub fn granted(proof: &PaymentProof, now: Timestamp) -> Self {
        Self {
            is_paid_user: true,
            payment_status: EntitlementStatus::Paid,
            paid_at: Some(now),
            payment_provider: Some(proof.provider()),
            payment_id: proof.payment_id().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_entitlement_is_unpaid() {
        let e = Entitlement::default();
        assert!(!e.is_paid_user);
        assert_eq!(e.payment_status, EntitlementStatus::Pending);
    }

    #[test]
    fn granted_entitlement_records_provider_and_payment_id() {
        let now = Timestamp::now();
        let e = Entitlement::granted(&PaymentProof::razorpay("pay_9", None), now);
        assert!(e.is_paid_user);
        assert_eq!(e.payment_status, EntitlementStatus::Paid);
        assert_eq!(e.paid_at, Some(now));
        assert_eq!(e.payment_provider, Some(PaymentProviderKind::Razorpay));
        assert_eq!(e.payment_id.as_deref(), Some("pay_9"));
    }
}
