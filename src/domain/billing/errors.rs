//! Billing error taxonomy.
//!
//! Every variant maps to one stable `ErrorCode` so clients can branch on the
//! code without matching message text.

use thiserror::Error;

use super::PaymentProviderKind;
use crate::domain::foundation::{DomainError, ErrorCode, PlanId, ValidationError};

/// Errors raised by checkout, verification and state transitions.
#[derive(Debug, Clone, Error)]
pub enum BillingError {
    /// Request body failed validation.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Plan not found: {0}")]
    PlanNotFound(PlanId),

    /// Organization plans are sold through sales, not checkout.
    #[error("Organization plans require contacting sales")]
    OrgPlanRequiresSales,

    /// The user already holds an entitling subscription.
    #[error("You already have an active subscription")]
    AlreadySubscribed,

    /// Provider credentials are missing.
    #[error("{} is not configured: missing {missing}", .provider.display_name())]
    ProviderNotConfigured {
        provider: PaymentProviderKind,
        missing: &'static str,
    },

    /// Webhook signing secret is missing.
    #[error("{} webhook not configured", .0.display_name())]
    WebhookNotConfigured(PaymentProviderKind),

    /// Signature or authenticity check failed.
    #[error("Signature verification failed: {0}")]
    InvalidSignature(String),

    /// Provider or network failure while creating the checkout artifact.
    #[error("Checkout failed: {0}")]
    Checkout(String),

    /// Subscription (or its transaction) does not exist.
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// Applying the transition would break the one-entitling-subscription rule.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The subscription's status does not allow the operation.
    #[error("Cannot {attempted} subscription in {current} state")]
    InvalidState { current: String, attempted: String },

    /// Storage or other infrastructure failure.
    #[error("Internal error: {0}")]
    Infrastructure(String),
}

impl BillingError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        BillingError::InvalidRequest(message.into())
    }

    pub fn provider_not_configured(provider: PaymentProviderKind, missing: &'static str) -> Self {
        BillingError::ProviderNotConfigured { provider, missing }
    }

    pub fn invalid_signature(reason: impl Into<String>) -> Self {
        BillingError::InvalidSignature(reason.into())
    }

    pub fn checkout(message: impl Into<String>) -> Self {
        BillingError::Checkout(message.into())
    }

    pub fn subscription_not_found(what: impl Into<String>) -> Self {
        BillingError::SubscriptionNotFound(what.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        BillingError::Conflict(message.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            BillingError::PlanNotFound(_) => ErrorCode::PlanNotFound,
            BillingError::OrgPlanRequiresSales => ErrorCode::OrgPlanRequiresSales,
            BillingError::AlreadySubscribed => ErrorCode::AlreadySubscribed,
            BillingError::ProviderNotConfigured { .. } => ErrorCode::ProviderNotConfigured,
            BillingError::WebhookNotConfigured(_) => ErrorCode::WebhookNotConfigured,
            BillingError::InvalidSignature(_) => ErrorCode::InvalidSignature,
            BillingError::Checkout(_) => ErrorCode::CheckoutError,
            BillingError::SubscriptionNotFound(_) => ErrorCode::SubscriptionNotFound,
            BillingError::Conflict(_) => ErrorCode::Conflict,
            BillingError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            BillingError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Configuration problems an operator must fix; never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BillingError::ProviderNotConfigured { .. } | BillingError::WebhookNotConfigured(_)
        )
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::SubscriptionNotFound => BillingError::SubscriptionNotFound(err.message),
            ErrorCode::Conflict => BillingError::Conflict(err.message),
            ErrorCode::AlreadySubscribed => BillingError::AlreadySubscribed,
            ErrorCode::InvalidSignature => BillingError::InvalidSignature(err.message),
            ErrorCode::ValidationFailed | ErrorCode::InvalidRequest => {
                BillingError::InvalidRequest(err.message)
            }
            ErrorCode::InvalidStateTransition => BillingError::InvalidState {
                current: err
                    .details
                    .get("current")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                attempted: err.message,
            },
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::InvalidRequest(err.to_string())
    }
}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        let code = err.code();
        match err {
            BillingError::InvalidRequest(message)
            | BillingError::SubscriptionNotFound(message)
            | BillingError::InvalidSignature(message)
            | BillingError::Conflict(message) => DomainError::new(code, message),
            BillingError::InvalidState { current, attempted } => {
                DomainError::new(code, attempted).with_detail("current", current)
            }
            other => DomainError::new(code, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_rejections_have_stable_codes() {
        assert_eq!(BillingError::AlreadySubscribed.code().to_string(), "ALREADY_SUBSCRIBED");
        assert_eq!(
            BillingError::OrgPlanRequiresSales.code().to_string(),
            "ORG_PLAN_REQUIRES_SALES"
        );
        assert_eq!(BillingError::checkout("boom").code().to_string(), "CHECKOUT_ERROR");
    }

    #[test]
    fn webhook_not_configured_names_provider() {
        let err = BillingError::WebhookNotConfigured(PaymentProviderKind::Razorpay);
        assert_eq!(err.to_string(), "Razorpay webhook not configured");
    }

    #[test]
    fn provider_not_configured_names_missing_key() {
        let err = BillingError::provider_not_configured(PaymentProviderKind::Stripe, "secret key");
        assert_eq!(err.to_string(), "Stripe is not configured: missing secret key");
        assert!(err.is_configuration());
    }

    #[test]
    fn domain_conflict_becomes_billing_conflict() {
        let err: BillingError = DomainError::new(ErrorCode::Conflict, "other active").into();
        assert!(matches!(err, BillingError::Conflict(m) if m == "other active"));
    }

    #[test]
    fn database_error_becomes_infrastructure() {
        let err: BillingError = DomainError::new(ErrorCode::DatabaseError, "down").into();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[test]
    fn conflict_survives_round_trip_through_domain_error() {
        let original = BillingError::conflict("user already entitled");
        let back: BillingError = DomainError::from(original).into();
        assert!(matches!(back, BillingError::Conflict(m) if m == "user already entitled"));
    }

    #[test]
    fn invalid_signature_survives_round_trip_through_domain_error() {
        let original = BillingError::invalid_signature("order mismatch");
        let back: BillingError = DomainError::from(original).into();
        assert!(matches!(back, BillingError::InvalidSignature(m) if m == "order mismatch"));
    }

    #[test]
    fn invalid_state_keeps_current_status() {
        let back: BillingError = DomainError::from(BillingError::invalid_state("cancelled", "activate")).into();
        assert_eq!(back.to_string(), "Cannot activate subscription in cancelled state");
    }
}
