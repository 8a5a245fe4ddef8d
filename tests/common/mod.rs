#![allow(dead_code)]

use billing_coordinator::application::lifecycle::SubscriptionManager;
use billing_coordinator::application::provisioning::PaymentMethodCoordinator;
use billing_coordinator::config::BillingConfig;
use billing_coordinator::domain::account::BillingAccount;
use billing_coordinator::domain::billing_details::{Address, BillingDetails, CardHandle};
use billing_coordinator::domain::events::BillingEvent;
use billing_coordinator::domain::subscription::{Plan, Subscription, SubscriptionStatus};
use billing_coordinator::infrastructure::events::ChannelEventSink;
use billing_coordinator::infrastructure::in_memory::InMemoryBillingBackend;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub struct Harness {
    pub backend: Arc<InMemoryBillingBackend>,
    pub coordinator: Arc<PaymentMethodCoordinator>,
    pub manager: Arc<SubscriptionManager>,
    pub events: UnboundedReceiver<BillingEvent>,
}

impl Harness {
    pub fn drain_events(&mut self) -> Vec<BillingEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

pub fn period_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 11, 30, 0, 0, 0).unwrap()
}

pub fn trial_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap()
}

pub fn card(handle: &str) -> CardHandle {
    CardHandle::new(handle).unwrap()
}

pub fn billing_details() -> BillingDetails {
    BillingDetails {
        name: "Ada Lovelace".to_string(),
        address: Address {
            line1: "1 Main St".to_string(),
            line2: Some("Suite 2".to_string()),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
            country: "US".to_string(),
        },
    }
}

/// Seeds `acct_1` and `acct_2` (active), `acct_trial` (trialing),
/// `acct_none` (no subscription) and `acct_canceled`.
pub async fn harness_with_latency(latency: Duration) -> Harness {
    let backend = InMemoryBillingBackend::new().with_latency(latency);
    for id in ["acct_1", "acct_2"] {
        backend
            .insert_account(
                BillingAccount::with_subscription(
                    id.into(),
                    Subscription::active(Plan::from_key("team-v1")),
                ),
                Some(period_end()),
            )
            .await;
    }
    backend
        .insert_account(
            BillingAccount::with_subscription(
                "acct_trial".into(),
                Subscription::trialing(Plan::from_key("team-v1"), trial_end()),
            ),
            Some(period_end()),
        )
        .await;
    backend
        .insert_account(BillingAccount::new("acct_none".into()), None)
        .await;

    let mut canceled = Subscription::active(Plan::from_key("beta-v1"));
    canceled.status = SubscriptionStatus::Canceled;
    canceled.effective_until = Some(period_end());
    backend
        .insert_account(
            BillingAccount::with_subscription("acct_canceled".into(), canceled),
            None,
        )
        .await;

    let backend = Arc::new(backend);
    let (sink, events) = ChannelEventSink::new();
    let sink = Arc::new(sink);
    let coordinator = PaymentMethodCoordinator::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        sink.clone(),
        BillingConfig::default(),
    );
    let manager = SubscriptionManager::new(
        backend.clone(),
        backend.clone(),
        sink,
        BillingConfig::default(),
    );
    Harness {
        backend,
        coordinator: Arc::new(coordinator),
        manager: Arc::new(manager),
        events,
    }
}

pub async fn harness() -> Harness {
    harness_with_latency(Duration::ZERO).await
}
