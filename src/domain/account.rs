use super::subscription::{Subscription, SubscriptionStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a billing account (a workspace, in the settings UI).
///
/// All guard and attempt state in the application layer is keyed by this type,
/// so nothing crosses account boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A billing account and the subscription it owns.
///
/// An account without a subscription carries one with status `none`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAccount {
    pub id: AccountId,
    #[serde(default)]
    pub subscription: Subscription,
}

impl BillingAccount {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            subscription: Subscription::none(),
        }
    }

    pub fn with_subscription(id: AccountId, subscription: Subscription) -> Self {
        Self { id, subscription }
    }

    /// The owned subscription, or `None` when the account has never subscribed.
    pub fn subscription(&self) -> Option<&Subscription> {
        match self.subscription.status {
            SubscriptionStatus::None => None,
            _ => Some(&self.subscription),
        }
    }
}
