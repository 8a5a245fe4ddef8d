use super::account::AccountId;
use super::billing_details::{BillingDetails, CardHandle, ProvisioningSecret};
use super::events::BillingEvent;
use super::subscription::Subscription;
use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reply of the provisioning service. The service may answer without a secret.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretResponse {
    pub payment_secret: Option<String>,
}

impl SecretResponse {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            payment_secret: Some(secret.into()),
        }
    }

    pub fn into_secret(self) -> Option<ProvisioningSecret> {
        self.payment_secret.and_then(ProvisioningSecret::new)
    }
}

/// Result of a card setup confirmation that reached the gateway.
///
/// A confirmation names the payment method the gateway attached; the account
/// service is the authority for its brand and last four digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    Confirmed { payment_method_id: String },
    Declined { message: String },
}

/// Internal service issuing one-time provisioning secrets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProvisioningService: Send + Sync {
    async fn request_provisioning_secret(
        &self,
        account_id: &AccountId,
    ) -> Result<SecretResponse, ServiceError>;
}

/// External payment gateway.
///
/// `confirm_card_setup` may suspend for as long as the gateway runs its own
/// challenge flow with the user; it resolves only once that is finished.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardGateway: Send + Sync {
    async fn confirm_card_setup(
        &self,
        secret: &ProvisioningSecret,
        card: &CardHandle,
        billing_details: &BillingDetails,
    ) -> Result<SetupOutcome, ServiceError>;
}

/// Read-only source of authoritative subscription state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountDataSource: Send + Sync {
    async fn fetch_subscription(&self, account_id: &AccountId)
    -> Result<Subscription, ServiceError>;
}

/// Remote side of subscription cancellation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    async fn cancel_subscription(&self, account_id: &AccountId) -> Result<(), ServiceError>;
}

/// Receiver of presentation events. Publishing must not block.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn publish(&self, event: BillingEvent);
}

pub type ProvisioningServiceRef = Arc<dyn ProvisioningService>;
pub type CardGatewayRef = Arc<dyn CardGateway>;
pub type AccountDataSourceRef = Arc<dyn AccountDataSource>;
pub type SubscriptionServiceRef = Arc<dyn SubscriptionService>;
pub type EventSinkRef = Arc<dyn EventSink>;
