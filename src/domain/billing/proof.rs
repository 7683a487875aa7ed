//! Proof of payment carried into activation.

use serde::{Deserialize, Serialize};

use super::PaymentProviderKind;

/// Provider correlation ids attached to a settled transaction.
///
/// Whichever ids the provider supplied are recorded; absent ones stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_charge_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub invoice_url: Option<String>,
}

impl PaymentProof {
    /// Proof from a completed Stripe checkout session.
    pub fn stripe(payment_intent_id: Option<String>) -> Self {
        Self {
            stripe_payment_intent_id: payment_intent_id,
            ..Default::default()
        }
    }

    /// Proof from a captured Razorpay payment.
    pub fn razorpay(payment_id: impl Into<String>, order_id: Option<String>) -> Self {
        Self {
            razorpay_payment_id: Some(payment_id.into()),
            razorpay_order_id: order_id,
            ..Default::default()
        }
    }

    pub fn with_invoice_url(mut self, url: impl Into<String>) -> Self {
        self.invoice_url = Some(url.into());
        self
    }

    /// Provider that issued this proof.
    pub fn provider(&self) -> PaymentProviderKind {
        if self.razorpay_payment_id.is_some() {
            PaymentProviderKind::Razorpay
        } else {
            PaymentProviderKind::Stripe
        }
    }

    /// The id recorded on the user as their payment reference.
    pub fn payment_id(&self) -> Option<&str> {
        self.razorpay_payment_id
            .as_deref()
            .or(self.stripe_payment_intent_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn razorpay_proof_reports_payment_id() {
        let proof = PaymentProof::razorpay("pay_1", Some("order_1".to_string()));
        assert_eq!(proof.provider(), PaymentProviderKind::Razorpay);
        assert_eq!(proof.payment_id(), Some("pay_1"));
    }

    #[test]
    fn stripe_proof_uses_payment_intent() {
        let proof = PaymentProof::stripe(Some("pi_1".to_string()));
        assert_eq!(proof.provider(), PaymentProviderKind::Stripe);
        assert_eq!(proof.payment_id(), Some("pi_1"));
    }

    #[test]
    fn stripe_proof_without_intent_has_no_payment_id() {
        assert_eq!(PaymentProof::stripe(None).payment_id(), None);
    }
}
