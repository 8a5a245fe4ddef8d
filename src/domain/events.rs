use super::account::AccountId;
use super::attempt::{CancellationPhase, ProvisioningPhase};
use super::subscription::SubscriptionStatus;
use serde::Serialize;

/// Discrete transitions published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum BillingEvent {
    #[serde(rename_all = "camelCase")]
    PhaseChanged {
        account_id: AccountId,
        phase: ProvisioningPhase,
    },
    #[serde(rename_all = "camelCase")]
    ErrorSet {
        account_id: AccountId,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    CancellationChanged {
        account_id: AccountId,
        phase: CancellationPhase,
    },
    #[serde(rename_all = "camelCase")]
    SubscriptionRefreshed {
        account_id: AccountId,
        status: SubscriptionStatus,
    },
}

impl BillingEvent {
    pub fn account_id(&self) -> &AccountId {
        match self {
            Self::PhaseChanged { account_id, .. }
            | Self::ErrorSet { account_id, .. }
            | Self::CancellationChanged { account_id, .. }
            | Self::SubscriptionRefreshed { account_id, .. } => account_id,
        }
    }
}
