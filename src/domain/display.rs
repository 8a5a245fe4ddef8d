use super::subscription::{PlanDetails, Subscription, SubscriptionStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which countdown banner the subscription panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "banner", rename_all = "camelCase")]
pub enum DisplayState {
    None,
    #[serde(rename_all = "camelCase")]
    TrialEnding { ends_at: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    CancellationScheduled { effective_until: DateTime<Utc> },
}

impl DisplayState {
    pub fn from_subscription(subscription: &Subscription) -> Self {
        match (
            subscription.status,
            subscription.trial_ends_at,
            subscription.effective_until,
        ) {
            (SubscriptionStatus::Trialing, Some(ends_at), _) => Self::TrialEnding { ends_at },
            (SubscriptionStatus::Canceled, _, Some(effective_until)) => {
                Self::CancellationScheduled { effective_until }
            }
            _ => Self::None,
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        match *self {
            Self::None => None,
            Self::TrialEnding { ends_at } => Some(ends_at),
            Self::CancellationScheduled { effective_until } => Some(effective_until),
        }
    }

    /// Banner text, with the date in `M/D/YYYY` form.
    pub fn banner(&self) -> Option<String> {
        let date = |at: DateTime<Utc>| at.format("%-m/%-d/%Y").to_string();
        match *self {
            Self::None => None,
            Self::TrialEnding { ends_at } => Some(format!("Trial ends {}", date(ends_at))),
            Self::CancellationScheduled { effective_until } => {
                Some(format!("Subscription ends {}", date(effective_until)))
            }
        }
    }

    /// Whole days left until the deadline, rounded up and never negative.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.deadline().map(|deadline| {
            let seconds = (deadline - now).num_seconds().max(0);
            (seconds + 86_399) / 86_400
        })
    }
}

/// Everything the subscription panel renders, derived without I/O.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOverview {
    pub status: SubscriptionStatus,
    pub display: DisplayState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanDetails>,
    pub payment_methods: Vec<String>,
    pub add_payment_method_offered: bool,
    pub cancellation_offered: bool,
}

impl SubscriptionOverview {
    pub fn from_subscription(subscription: &Subscription) -> Self {
        let display = DisplayState::from_subscription(subscription);
        let methods = subscription.active_payment_methods();
        let has_subscription = subscription.status != SubscriptionStatus::None;
        Self {
            status: subscription.status,
            display,
            banner: display.banner(),
            plan: subscription.plan.as_ref().and_then(|plan| plan.details()),
            payment_methods: methods.iter().map(ToString::to_string).collect(),
            add_payment_method_offered: has_subscription && methods.is_empty(),
            cancellation_offered: subscription.status.is_cancelable(),
        }
    }
}
