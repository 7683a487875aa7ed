//! StartCheckoutHandler - opens a subscription attempt and a provider checkout.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::SettingsResolver;
use crate::domain::billing::{
    BillingError, BillingInterval, PaymentProviderKind, PaymentTransaction, Subscription,
};
use crate::domain::foundation::{PlanId, SubscriptionId, Timestamp, TransactionId, UserId};
use crate::ports::{
    BillingReader, CheckoutArtifact, CheckoutRequest, ProviderClientFactory, SubscriptionLedger,
};

/// Command to start a checkout.
#[derive(Debug, Clone)]
pub struct StartCheckoutCommand {
    pub user_id: UserId,
    /// Receipt email passed to the provider when known.
    pub email: Option<String>,
    pub plan_id: PlanId,
    pub billing_interval: BillingInterval,
    /// Caller's preferred provider; the platform default when `None`.
    pub provider: Option<PaymentProviderKind>,
}

/// Result of a successful checkout start.
#[derive(Debug, Clone)]
pub struct StartCheckoutResult {
    pub subscription_id: SubscriptionId,
    pub transaction_id: TransactionId,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub artifact: CheckoutArtifact,
}

/// Handler for starting checkouts.
///
/// Credentials are resolved before anything is written, so a misconfigured
/// provider never leaves a pending row. The provider call happens after the
/// ledger commit; if it fails the pending row is left for the next attempt
/// to reconcile.
pub struct StartCheckoutHandler {
    reader: Arc<dyn BillingReader>,
    ledger: Arc<dyn SubscriptionLedger>,
    settings: Arc<SettingsResolver>,
    clients: Arc<dyn ProviderClientFactory>,
}

impl StartCheckoutHandler {
    pub fn new(
        reader: Arc<dyn BillingReader>,
        ledger: Arc<dyn SubscriptionLedger>,
        settings: Arc<SettingsResolver>,
        clients: Arc<dyn ProviderClientFactory>,
    ) -> Self {
        Self {
            reader,
            ledger,
            settings,
            clients,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartCheckoutCommand,
    ) -> Result<StartCheckoutResult, BillingError> {
        // 1. Plan must exist and be sold through checkout
        let plan = self
            .reader
            .find_plan(&cmd.plan_id)
            .await?
            .ok_or(BillingError::PlanNotFound(cmd.plan_id))?;
        if plan.requires_sales() {
            return Err(BillingError::OrgPlanRequiresSales);
        }

        // 2. Resolve provider and build its client
        let settings = self.settings.resolve().await?;
        let provider = settings.provider(cmd.provider);
        let credentials = settings.credentials(provider)?;
        let client = self.clients.client(&credentials)?;

        // 3. Price the attempt
        let amount = plan.amount_for(cmd.billing_interval);
        let currency = if plan.currency.trim().is_empty() {
            settings.default_currency.clone()
        } else {
            plan.currency.clone()
        };

        // 4. Reconcile stale attempts, guard, and insert in one ledger call
        let now = Timestamp::now();
        let subscription =
            Subscription::open_pending(cmd.user_id.clone(), plan.id, cmd.billing_interval, now);
        let transaction = PaymentTransaction::open(
            cmd.user_id.clone(),
            subscription.id,
            provider,
            amount,
            currency.clone(),
            Some(format!("{} ({})", plan.name, cmd.billing_interval)),
            now,
        );
        let opened = self.ledger.open_checkout(subscription, transaction).await?;
        let subscription_id = opened.subscription.id;
        let transaction_id = opened.transaction.id;
        if opened.reconciled > 0 {
            info!(
                user_id = %cmd.user_id,
                reconciled = opened.reconciled,
                "Cancelled stale pending subscriptions"
            );
        }

        // 5. Create the provider artifact
        let request = CheckoutRequest {
            subscription_id,
            transaction_id: transaction_id.clone(),
            plan_name: plan.name.clone(),
            plan_description: plan.description.clone(),
            billing_interval: cmd.billing_interval,
            amount,
            currency: currency.clone(),
            customer_email: cmd.email,
            success_url: settings.success_url.clone(),
            cancel_url: settings.cancel_url.clone(),
        };
        let artifact = client.create_checkout(&request).await.map_err(|e| {
            warn!(
                subscription_id = %subscription_id,
                provider = %provider,
                error = %e,
                "Provider checkout creation failed"
            );
            BillingError::from(e)
        })?;

        // 6. Orders are confirmed against their id later
        if let CheckoutArtifact::Razorpay { order_id, .. } = &artifact {
            self.ledger.attach_order_id(&transaction_id, order_id).await?;
        }

        info!(
            user_id = %cmd.user_id,
            subscription_id = %subscription_id,
            provider = %provider,
            amount,
            "Checkout started"
        );

        Ok(StartCheckoutResult {
            subscription_id,
            transaction_id,
            amount,
            currency,
            artifact,
        })
    }
}
