//! Payment provider signature verification.
//!
//! Three distinct proofs are checked here:
//!
//! - Stripe webhooks: HMAC-SHA256 over `"{t}.{raw body}"`, carried in the
//!   `Stripe-Signature` header with a replay window on `t`.
//! - Razorpay webhooks: HMAC-SHA256 over the raw body, hex in
//!   `x-razorpay-signature`.
//! - Razorpay client verification: HMAC-SHA256 over `"{order_id}|{payment_id}"`,
//!   returned by the browser after checkout.
//!
//! All comparisons are constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::domain::foundation::Timestamp;

/// Maximum allowed age for Stripe webhook signatures (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future-dated signatures (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Why a signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingHeader,

    #[error("malformed signature header: {0}")]
    Malformed(String),

    #[error("signature mismatch")]
    Mismatch,

    #[error("signature timestamp outside tolerance window")]
    TimestampOutOfRange,

    #[error("signature timestamp is in the future")]
    FutureTimestamp,
}

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeSignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// Every `v1` signature present; more than one during secret rotation.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl StripeSignatureHeader {
    /// Parses `t=<timestamp>,v1=<hex>[,v1=<hex>...]`. Unknown keys are ignored.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| SignatureError::Malformed("expected key=value pairs".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        SignatureError::Malformed("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    let bytes = hex::decode(value).map_err(|_| {
                        SignatureError::Malformed("invalid v1 signature hex".to_string())
                    })?;
                    v1_signatures.push(bytes);
                }
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| SignatureError::Malformed("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(SignatureError::Malformed("missing v1 signature".to_string()));
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for Stripe webhook signatures.
pub struct StripeWebhookVerifier<'a> {
    secret: &'a str,
}

impl<'a> StripeWebhookVerifier<'a> {
    pub fn new(secret: &'a str) -> Self {
        Self { secret }
    }

    /// Checks the header against the exact request bytes.
    ///
    /// # Errors
    ///
    /// - `Malformed` - header could not be parsed
    /// - `TimestampOutOfRange` - signed more than five minutes ago
    /// - `FutureTimestamp` - signed more than one minute in the future
    /// - `Mismatch` - no `v1` signature matches
    pub fn verify(
        &self,
        payload: &[u8],
        header: &str,
        now: Timestamp,
    ) -> Result<(), SignatureError> {
        let header = StripeSignatureHeader::parse(header)?;

        let age = now
            .as_unix_secs()
            .checked_sub(header.timestamp)
            .ok_or(SignatureError::TimestampOutOfRange)?;
        if age > MAX_EVENT_AGE_SECS {
            return Err(SignatureError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(SignatureError::FutureTimestamp);
        }

        let prefix = format!("{}.", header.timestamp);
        let expected = hmac_sha256(self.secret, &[prefix.as_bytes(), payload])?;

        if header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_eq(&expected, candidate))
        {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// Verifier for Razorpay webhook signatures.
pub struct RazorpayWebhookVerifier<'a> {
    secret: &'a str,
}

impl<'a> RazorpayWebhookVerifier<'a> {
    pub fn new(secret: &'a str) -> Self {
        Self { secret }
    }

    /// Checks the hex signature against the exact request bytes.
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<(), SignatureError> {
        let expected = hmac_sha256(self.secret, &[payload])?;
        compare_hex(&expected, signature)
    }
}

/// Checks the signature the browser returns after a Razorpay checkout.
///
/// The signed message is `"{order_id}|{payment_id}"` keyed with the API key
/// secret, not the webhook secret.
pub fn verify_razorpay_payment_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), SignatureError> {
    let expected = hmac_sha256(
        key_secret,
        &[order_id.as_bytes(), b"|", payment_id.as_bytes()],
    )?;
    compare_hex(&expected, signature)
}

/// Builds a `Stripe-Signature` header value for `payload`.
pub fn sign_stripe_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let prefix = format!("{}.", timestamp);
    let mac = hmac_sha256(secret, &[prefix.as_bytes(), payload]).unwrap_or_default();
    format!("t={},v1={}", timestamp, hex::encode(mac))
}

/// Builds an `x-razorpay-signature` header value for `payload`.
pub fn sign_razorpay_payload(secret: &str, payload: &[u8]) -> String {
    hex::encode(hmac_sha256(secret, &[payload]).unwrap_or_default())
}

/// Builds the client-side Razorpay payment signature.
pub fn sign_razorpay_payment(key_secret: &str, order_id: &str, payment_id: &str) -> String {
    let mac = hmac_sha256(
        key_secret,
        &[order_id.as_bytes(), b"|", payment_id.as_bytes()],
    )
    .unwrap_or_default();
    hex::encode(mac)
}

fn hmac_sha256(secret: &str, parts: &[&[u8]]) -> Result<Vec<u8>, SignatureError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Malformed("unusable signing secret".to_string()))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

fn compare_hex(expected: &[u8], signature_hex: &str) -> Result<(), SignatureError> {
    let provided = hex::decode(signature_hex.trim()).map_err(|_| SignatureError::Mismatch)?;
    if constant_time_eq(expected, &provided) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
