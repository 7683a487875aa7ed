//! Billing interval and period arithmetic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, ValidationError};

/// How often a subscription is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
    OneTime,
}

impl BillingInterval {
    /// End of the first paid period starting at `start`.
    ///
    /// Quarterly adds three calendar months, yearly one calendar year,
    /// everything else (monthly and one-time) one calendar month.
    pub fn period_end(&self, start: Timestamp) -> Timestamp {
        match self {
            BillingInterval::Quarterly => start.add_months(3),
            BillingInterval::Yearly => start.add_years(1),
            BillingInterval::Monthly | BillingInterval::OneTime => start.add_months(1),
        }
    }

    /// Stable storage/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Quarterly => "quarterly",
            BillingInterval::Yearly => "yearly",
            BillingInterval::OneTime => "one_time",
        }
    }
}

impl fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingInterval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingInterval::Monthly),
            "quarterly" => Ok(BillingInterval::Quarterly),
            "yearly" => Ok(BillingInterval::Yearly),
            "one_time" => Ok(BillingInterval::OneTime),
            other => Err(ValidationError::invalid_format(
                "billing_interval",
                format!("unknown interval '{}'", other),
            )),
        }
    }
}
