//! GetSubscriptionStatusHandler - the caller's current subscription.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::UserId;
use crate::ports::{BillingReader, SubscriptionStatusView};

/// Query for a user's latest subscription.
#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub user_id: UserId,
}

/// Result of the status query. `None` when the user never subscribed.
#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusResult {
    pub subscription: Option<SubscriptionStatusView>,
}

/// Handler for status queries.
pub struct GetSubscriptionStatusHandler {
    reader: Arc<dyn BillingReader>,
}

impl GetSubscriptionStatusHandler {
    pub fn new(reader: Arc<dyn BillingReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<GetSubscriptionStatusResult, BillingError> {
        let subscription = self.reader.latest_subscription(&query.user_id).await?;
        Ok(GetSubscriptionStatusResult { subscription })
    }
}
