//! Catalog plans and charge computation.
//!
//! Plans are read-only to the billing engine. Prices are minor units
//! (paise, cents) and never floats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::BillingInterval;
use crate::domain::foundation::{PlanId, ValidationError};

/// Currency assumed when a plan row does not carry one.
pub const DEFAULT_CURRENCY: &str = "INR";

/// Who a plan is sold to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    /// Self-serve plan bought through checkout.
    Individual,
    /// Seat-based plan sold through the sales team.
    Organization,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Individual => "individual",
            PlanType::Organization => "organization",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(PlanType::Individual),
            "organization" => Ok(PlanType::Organization),
            other => Err(ValidationError::invalid_format(
                "plan_type",
                format!("unknown plan type '{}'", other),
            )),
        }
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub plan_type: PlanType,
    /// Monthly price in minor units.
    pub price_monthly: i64,
    /// Yearly price in minor units; `None` means twelve monthly payments.
    pub price_yearly: Option<i64>,
    pub currency: String,
}

impl Plan {
    /// Amount charged for one checkout at the given interval.
    ///
    /// Yearly uses the yearly price when set, else `price_monthly * 12`.
    /// Every other interval charges the monthly price.
    pub fn amount_for(&self, interval: BillingInterval) -> i64 {
        match interval {
            BillingInterval::Yearly => self
                .price_yearly
                .unwrap_or_else(|| self.price_monthly.saturating_mul(12)),
            _ => self.price_monthly,
        }
    }

    /// True when checkout must be refused and routed to sales.
    pub fn requires_sales(&self) -> bool {
        self.plan_type == PlanType::Organization
    }

    /// Currency code, never empty.
    pub fn currency(&self) -> &str {
        if self.currency.trim().is_empty() {
            DEFAULT_CURRENCY
        } else {
            &self.currency
        }
    }
}
