//! Stripe REST response shapes used by the gateway.

use serde::Deserialize;

use crate::ports::{PaymentError, PaymentErrorCode};

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Object Types
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe Checkout Session object, reduced to the fields we read.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    /// Hosted checkout page. Absent for embedded sessions.
    #[serde(default)]
    pub url: Option<String>,

    /// Session status (open, complete, expired).
    #[serde(default)]
    pub status: Option<String>,
}

/// Body Stripe sends with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Maps a failed Stripe response to a `PaymentError`.
pub fn stripe_error(status: u16, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<StripeErrorBody>(body).ok().map(|b| b.error);
    let message = parsed
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("Stripe API error (HTTP {})", status));

    let code = match (status, parsed.as_ref().and_then(|e| e.error_type.as_deref())) {
        (401, _) | (_, Some("authentication_error")) => PaymentErrorCode::AuthenticationError,
        (400, _) | (_, Some("invalid_request_error")) => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    let error = PaymentError::new(code, message);
    match parsed.and_then(|e| e.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_parses_with_url() {
        let session: StripeCheckoutSession = serde_json::from_str(
            r#"{"id":"cs_test_1","object":"checkout.session","url":"https://checkout.stripe.com/c/pay/cs_test_1","status":"open"}"#,
        )
        .unwrap();
        assert_eq!(session.id, "cs_test_1");
        assert!(session.url.unwrap().ends_with("cs_test_1"));
    }

    #[test]
    fn bad_key_maps_to_authentication_error() {
        let err = stripe_error(
            401,
            r#"{"error":{"type":"invalid_request_error","message":"Invalid API Key provided: sk_test_***"}}"#,
        );
        assert_eq!(err.code, PaymentErrorCode::AuthenticationError);
        assert!(err.message.starts_with("Invalid API Key"));
    }

    #[test]
    fn parameter_error_keeps_provider_code() {
        let err = stripe_error(
            400,
            r#"{"error":{"type":"invalid_request_error","code":"parameter_invalid_integer","message":"Invalid integer"}}"#,
        );
        assert_eq!(err.code, PaymentErrorCode::InvalidRequest);
        assert_eq!(err.provider_code.as_deref(), Some("parameter_invalid_integer"));
    }

    #[test]
    fn unparseable_body_is_provider_error() {
        let err = stripe_error(502, "<html>bad gateway</html>");
        assert_eq!(err.code, PaymentErrorCode::ProviderError);
        assert!(err.message.contains("502"));
    }
}
