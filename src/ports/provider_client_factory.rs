//! ProviderClientFactory port - builds payment gateways from resolved credentials.
//!
//! Injected once per process. Implementations may cache clients, but the
//! credentials passed in are always the freshly resolved ones.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::PaymentGateway;
use crate::domain::billing::{BillingError, PaymentProviderKind};

/// Credentials needed to open checkouts with one provider.
#[derive(Debug, Clone)]
pub enum ProviderCredentials {
    Stripe {
        secret_key: SecretString,
        publishable_key: Option<String>,
    },
    Razorpay {
        key_id: String,
        key_secret: SecretString,
    },
}

impl ProviderCredentials {
    pub fn provider(&self) -> PaymentProviderKind {
        match self {
            ProviderCredentials::Stripe { .. } => PaymentProviderKind::Stripe,
            ProviderCredentials::Razorpay { .. } => PaymentProviderKind::Razorpay,
        }
    }

    /// Whether two credential sets would produce the same client.
    pub fn same_as(&self, other: &ProviderCredentials) -> bool {
        match (self, other) {
            (
                ProviderCredentials::Stripe {
                    secret_key: a,
                    publishable_key: pa,
                },
                ProviderCredentials::Stripe {
                    secret_key: b,
                    publishable_key: pb,
                },
            ) => a.expose_secret() == b.expose_secret() && pa == pb,
            (
                ProviderCredentials::Razorpay {
                    key_id: a,
                    key_secret: sa,
                },
                ProviderCredentials::Razorpay {
                    key_id: b,
                    key_secret: sb,
                },
            ) => a == b && sa.expose_secret() == sb.expose_secret(),
            _ => false,
        }
    }
}

/// Builds (or reuses) the gateway for a set of credentials.
pub trait ProviderClientFactory: Send + Sync {
    /// # Errors
    ///
    /// - `BillingError::ProviderNotConfigured` if a client cannot be built
    fn client(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<Arc<dyn PaymentGateway>, BillingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripe(key: &str) -> ProviderCredentials {
        ProviderCredentials::Stripe {
            secret_key: SecretString::new(key.to_string()),
            publishable_key: Some("pk_test".to_string()),
        }
    }

    #[test]
    fn same_credentials_compare_equal() {
        assert!(stripe("sk_1").same_as(&stripe("sk_1")));
    }

    #[test]
    fn rotated_secret_is_a_different_client() {
        assert!(!stripe("sk_1").same_as(&stripe("sk_2")));
    }

    #[test]
    fn providers_never_compare_equal() {
        let razorpay = ProviderCredentials::Razorpay {
            key_id: "rzp_test".to_string(),
            key_secret: SecretString::new("sk_1".to_string()),
        };
        assert!(!stripe("sk_1").same_as(&razorpay));
        assert_eq!(razorpay.provider(), PaymentProviderKind::Razorpay);
    }
}
