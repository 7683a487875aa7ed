//! Supported payment providers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Closed set of payment providers the engine can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProviderKind {
    /// Card processor with hosted checkout sessions.
    #[default]
    Stripe,
    /// Regional gateway with client-side order completion.
    Razorpay,
}

impl PaymentProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProviderKind::Stripe => "stripe",
            PaymentProviderKind::Razorpay => "razorpay",
        }
    }

    /// Human-readable name for operator-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentProviderKind::Stripe => "Stripe",
            PaymentProviderKind::Razorpay => "Razorpay",
        }
    }
}

impl fmt::Display for PaymentProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProviderKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(PaymentProviderKind::Stripe),
            "razorpay" => Ok(PaymentProviderKind::Razorpay),
            other => Err(ValidationError::invalid_format(
                "payment_provider",
                format!("unsupported provider '{}'", other),
            )),
        }
    }
}
