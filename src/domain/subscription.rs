use super::payment_method::PaymentMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    None,
    Trialing,
    Active,
    Canceled,
}

impl SubscriptionStatus {
    /// Cancellation is only offered while the subscription is running.
    pub fn is_cancelable(self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plan descriptor as reported by the account service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Plan {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Plan {
    pub fn from_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Details to render for this plan. Known plan keys use the built-in
    /// catalog; otherwise the remote title and features are used if present.
    pub fn details(&self) -> Option<PlanDetails> {
        PlanDetails::for_key(&self.key).or_else(|| {
            (!self.title.is_empty()).then(|| PlanDetails {
                title: self.title.clone(),
                description: None,
                features: self.features.clone(),
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanDetails {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl PlanDetails {
    pub fn for_key(key: &str) -> Option<Self> {
        match key {
            "beta-v1" | "test-beta-v1" => Some(Self {
                title: "Beta Plan".to_string(),
                description: Some(
                    "As a thank you for being a beta user, you have full access for a limited \
                     time to Replay including recording, debugging, and collaborating with your \
                     team."
                        .to_string(),
                ),
                features: Vec::new(),
            }),
            "team-v1" | "test-team-v1" => Some(Self {
                title: "Team Plan".to_string(),
                description: None,
                features: vec![
                    "Unlimited recordings".to_string(),
                    "Team Library to easily share recordings".to_string(),
                    "Programmatic recording upload with personal and team API keys".to_string(),
                ],
            }),
            _ => None,
        }
    }
}

/// Subscription state as last fetched from the account service.
///
/// `payment_methods` is in creation order; new cards are appended.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub status: SubscriptionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("trialing subscription has no trial end date")]
    MissingTrialEnd,
    #[error("trial end date set on a `{0}` subscription")]
    UnexpectedTrialEnd(SubscriptionStatus),
    #[error("effective-until date set on a `{0}` subscription")]
    UnexpectedEffectiveUntil(SubscriptionStatus),
}

impl Subscription {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn trialing(plan: Plan, trial_ends_at: DateTime<Utc>) -> Self {
        Self {
            status: SubscriptionStatus::Trialing,
            plan: Some(plan),
            trial_ends_at: Some(trial_ends_at),
            ..Self::default()
        }
    }

    pub fn active(plan: Plan) -> Self {
        Self {
            status: SubscriptionStatus::Active,
            plan: Some(plan),
            ..Self::default()
        }
    }

    /// Payment methods that count as active. A `none` subscription has none,
    /// whatever the account service returned.
    pub fn active_payment_methods(&self) -> &[PaymentMethod] {
        match self.status {
            SubscriptionStatus::None => &[],
            _ => &self.payment_methods,
        }
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        match (self.status, self.trial_ends_at) {
            (SubscriptionStatus::Trialing, None) => {
                return Err(InvariantViolation::MissingTrialEnd);
            }
            (status, Some(_)) if status != SubscriptionStatus::Trialing => {
                return Err(InvariantViolation::UnexpectedTrialEnd(status));
            }
            _ => {}
        }
        if self.effective_until.is_some() && self.status != SubscriptionStatus::Canceled {
            return Err(InvariantViolation::UnexpectedEffectiveUntil(self.status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment_method::CardBrand;
    use chrono::TimeZone;

    fn trial_end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Trialing).unwrap(),
            "\"trialing\""
        );
        let status: SubscriptionStatus = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(status, SubscriptionStatus::Canceled);
    }

    #[test]
    fn test_cancelable_statuses() {
        assert!(SubscriptionStatus::Active.is_cancelable());
        assert!(SubscriptionStatus::Trialing.is_cancelable());
        assert!(!SubscriptionStatus::None.is_cancelable());
        assert!(!SubscriptionStatus::Canceled.is_cancelable());
    }

    #[test]
    fn test_plan_catalog() {
        let team = Plan::from_key("test-team-v1").details().unwrap();
        assert_eq!(team.title, "Team Plan");
        assert_eq!(team.features.len(), 3);

        let beta = Plan::from_key("beta-v1").details().unwrap();
        assert_eq!(beta.title, "Beta Plan");
        assert!(beta.description.is_some());

        assert!(Plan::from_key("enterprise-v9").details().is_none());
    }

    #[test]
    fn test_unknown_plan_uses_remote_title() {
        let plan = Plan {
            key: "org-v2".to_string(),
            title: "Organization".to_string(),
            features: vec!["SSO".to_string()],
        };
        let details = plan.details().unwrap();
        assert_eq!(details.title, "Organization");
        assert_eq!(details.features, vec!["SSO".to_string()]);
    }

    #[test]
    fn test_none_subscription_hides_payment_methods() {
        let mut sub = Subscription::none();
        sub.payment_methods
            .push(PaymentMethod::new("pm_1", CardBrand::Visa, "4242").unwrap());
        assert!(sub.active_payment_methods().is_empty());

        sub.status = SubscriptionStatus::Active;
        assert_eq!(sub.active_payment_methods().len(), 1);
    }

    #[test]
    fn test_invariants() {
        assert!(
            Subscription::trialing(Plan::from_key("team-v1"), trial_end())
                .check_invariants()
                .is_ok()
        );

        let mut sub = Subscription::active(Plan::from_key("team-v1"));
        assert!(sub.check_invariants().is_ok());

        sub.trial_ends_at = Some(trial_end());
        assert_eq!(
            sub.check_invariants(),
            Err(InvariantViolation::UnexpectedTrialEnd(
                SubscriptionStatus::Active
            ))
        );

        sub.trial_ends_at = None;
        sub.effective_until = Some(trial_end());
        assert_eq!(
            sub.check_invariants(),
            Err(InvariantViolation::UnexpectedEffectiveUntil(
                SubscriptionStatus::Active
            ))
        );

        let mut trialing = Subscription::trialing(Plan::from_key("team-v1"), trial_end());
        trialing.trial_ends_at = None;
        assert_eq!(
            trialing.check_invariants(),
            Err(InvariantViolation::MissingTrialEnd)
        );
    }

    #[test]
    fn test_subscription_json_shape() {
        let json = r#"{
            "status": "canceled",
            "plan": {"key": "team-v1"},
            "effectiveUntil": "2026-12-01T00:00:00Z",
            "paymentMethods": [{"id": "pm_1", "brand": "amex", "last4": "0005"}]
        }"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert_eq!(sub.payment_methods[0].brand, CardBrand::Amex);
        assert!(sub.effective_until.is_some());
        assert!(sub.check_invariants().is_ok());
    }
}
