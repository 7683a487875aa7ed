//! Caching provider client factory.
//!
//! Keeps one gateway per provider and rebuilds it only when the resolved
//! credentials change, so admins can rotate keys without a restart.

use std::sync::{Arc, Mutex};

use crate::adapters::razorpay::{RazorpayConfig, RazorpayGateway};
use crate::adapters::stripe::{StripeConfig, StripeGateway};
use crate::domain::billing::{BillingError, PaymentProviderKind};
use crate::ports::{PaymentGateway, ProviderClientFactory, ProviderCredentials};

struct CachedClient {
    credentials: ProviderCredentials,
    client: Arc<dyn PaymentGateway>,
}

/// Single-slot cache per provider over the real REST gateways.
pub struct CachingProviderFactory {
    http_client: reqwest::Client,
    stripe: Mutex<Option<CachedClient>>,
    razorpay: Mutex<Option<CachedClient>>,
}

impl CachingProviderFactory {
    /// All gateways share `http_client` and its connection pool.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            stripe: Mutex::new(None),
            razorpay: Mutex::new(None),
        }
    }

    fn build(&self, credentials: &ProviderCredentials) -> Arc<dyn PaymentGateway> {
        match credentials {
            ProviderCredentials::Stripe {
                secret_key,
                publishable_key,
            } => Arc::new(StripeGateway::new(
                StripeConfig::new(secret_key.clone(), publishable_key.clone()),
                self.http_client.clone(),
            )),
            ProviderCredentials::Razorpay { key_id, key_secret } => Arc::new(RazorpayGateway::new(
                RazorpayConfig::new(key_id.clone(), key_secret.clone()),
                self.http_client.clone(),
            )),
        }
    }
}

impl ProviderClientFactory for CachingProviderFactory {
    fn client(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<Arc<dyn PaymentGateway>, BillingError> {
        let slot = match credentials.provider() {
            PaymentProviderKind::Stripe => &self.stripe,
            PaymentProviderKind::Razorpay => &self.razorpay,
        };
        let mut cached = slot
            .lock()
            .map_err(|_| BillingError::infrastructure("provider client cache poisoned"))?;

        if let Some(entry) = cached.as_ref() {
            if entry.credentials.same_as(credentials) {
                return Ok(Arc::clone(&entry.client));
            }
        }

        tracing::debug!(provider = %credentials.provider(), "Building payment provider client");
        let client = self.build(credentials);
        *cached = Some(CachedClient {
            credentials: credentials.clone(),
            client: Arc::clone(&client),
        });
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn stripe(key: &str) -> ProviderCredentials {
        ProviderCredentials::Stripe {
            secret_key: SecretString::new(key.to_string()),
            publishable_key: None,
        }
    }

    fn razorpay() -> ProviderCredentials {
        ProviderCredentials::Razorpay {
            key_id: "rzp_test".to_string(),
            key_secret: SecretString::new("secret".to_string()),
        }
    }

    #[test]
    fn same_credentials_reuse_client() {
        let factory = CachingProviderFactory::new(reqwest::Client::new());
        let a = factory.client(&stripe("sk_1")).unwrap();
        let b = factory.client(&stripe("sk_1")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn rotated_key_builds_new_client() {
        let factory = CachingProviderFactory::new(reqwest::Client::new());
        let a = factory.client(&stripe("sk_1")).unwrap();
        let b = factory.client(&stripe("sk_2")).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn providers_have_separate_slots() {
        let factory = CachingProviderFactory::new(reqwest::Client::new());
        let s = factory.client(&stripe("sk_1")).unwrap();
        let r = factory.client(&razorpay()).unwrap();
        let s_again = factory.client(&stripe("sk_1")).unwrap();

        assert_eq!(s.kind(), PaymentProviderKind::Stripe);
        assert_eq!(r.kind(), PaymentProviderKind::Razorpay);
        assert!(Arc::ptr_eq(&s, &s_again));
    }
}
