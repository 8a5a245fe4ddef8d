use super::guard::{InFlightGuard, InFlightRegistry};
use crate::config::BillingConfig;
use crate::domain::account::AccountId;
use crate::domain::attempt::{CancellationPhase, OperationPhase};
use crate::domain::display::{DisplayState, SubscriptionOverview};
use crate::domain::events::BillingEvent;
use crate::domain::ports::{AccountDataSourceRef, EventSinkRef, SubscriptionServiceRef};
use crate::domain::subscription::Subscription;
use crate::error::{CancellationError, ServiceError};
use tracing::{debug, info, warn};

/// Which banner to show for a subscription. Pure; no I/O.
pub fn describe(subscription: &Subscription) -> DisplayState {
    DisplayState::from_subscription(subscription)
}

/// Derives display state and drives cancellation for billing accounts.
pub struct SubscriptionManager {
    accounts: AccountDataSourceRef,
    subscriptions: SubscriptionServiceRef,
    events: EventSinkRef,
    cancellations: InFlightRegistry<CancellationPhase>,
    config: BillingConfig,
}

impl SubscriptionManager {
    pub fn new(
        accounts: AccountDataSourceRef,
        subscriptions: SubscriptionServiceRef,
        events: EventSinkRef,
        config: BillingConfig,
    ) -> Self {
        let cancellations = InFlightRegistry::new(config.cancellation_fallback_message.clone());
        Self {
            accounts,
            subscriptions,
            events,
            cancellations,
            config,
        }
    }

    pub fn describe(&self, subscription: &Subscription) -> DisplayState {
        describe(subscription)
    }

    pub fn overview(&self, subscription: &Subscription) -> SubscriptionOverview {
        SubscriptionOverview::from_subscription(subscription)
    }

    pub fn cancellation_phase(&self, account_id: &AccountId) -> CancellationPhase {
        self.cancellations.phase(account_id)
    }

    pub fn is_cancelling(&self, account_id: &AccountId) -> bool {
        self.cancellation_phase(account_id).is_in_flight()
    }

    /// Re-reads the subscription from the account service.
    pub async fn refresh(&self, account_id: &AccountId) -> Result<Subscription, ServiceError> {
        let subscription = self.accounts.fetch_subscription(account_id).await?;
        if let Err(violation) = subscription.check_invariants() {
            warn!(%account_id, %violation, "subscriptions: inconsistent subscription from account service");
        }
        debug!(%account_id, status = %subscription.status, "subscriptions: refreshed");
        self.events.publish(BillingEvent::SubscriptionRefreshed {
            account_id: account_id.clone(),
            status: subscription.status,
        });
        Ok(subscription)
    }

    /// Cancels the account's subscription at the end of its billing period.
    ///
    /// The end date is decided remotely; call [`refresh`](Self::refresh)
    /// afterwards to see it.
    ///
    /// # Errors
    ///
    /// - [`CancellationError::AlreadyInProgress`] if a cancellation for the
    ///   account is running; no remote call is made.
    /// - [`CancellationError::InvalidState`] unless the subscription is
    ///   active or trialing.
    /// - [`CancellationError::CancellationFailed`] if reading the subscription
    ///   or the cancellation itself failed.
    pub async fn cancel(&self, account_id: &AccountId) -> Result<(), CancellationError> {
        let Some(mut cancellation) = self
            .cancellations
            .try_begin(account_id, CancellationPhase::InFlight)
        else {
            debug!(%account_id, "subscriptions: cancellation already in flight");
            return Err(CancellationError::AlreadyInProgress);
        };
        self.publish(account_id, CancellationPhase::InFlight);

        let subscription = match self.accounts.fetch_subscription(account_id).await {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!(%account_id, error = %err, "subscriptions: could not read subscription before cancelling");
                let message = self.config.cancellation_fallback_message.clone();
                return Err(self.fail(&mut cancellation, message));
            }
        };
        if !subscription.status.is_cancelable() {
            warn!(%account_id, status = %subscription.status, "subscriptions: cancel requested in wrong state");
            let previous = cancellation.restore();
            self.publish(account_id, previous);
            return Err(CancellationError::InvalidState {
                status: subscription.status,
            });
        }

        info!(%account_id, status = %subscription.status, "subscriptions: cancelling");
        match self.subscriptions.cancel_subscription(account_id).await {
            Ok(()) => {
                info!(%account_id, "subscriptions: cancellation accepted");
                cancellation.set(CancellationPhase::Completed);
                self.publish(account_id, CancellationPhase::Completed);
                Ok(())
            }
            Err(ServiceError::Remote { message }) if !message.trim().is_empty() => {
                warn!(%account_id, %message, "subscriptions: cancellation rejected");
                Err(self.fail(&mut cancellation, message))
            }
            Err(err) => {
                warn!(%account_id, error = %err, "subscriptions: cancellation call failed");
                let message = self.config.cancellation_fallback_message.clone();
                Err(self.fail(&mut cancellation, message))
            }
        }
    }

    fn fail(
        &self,
        cancellation: &mut InFlightGuard<CancellationPhase>,
        message: String,
    ) -> CancellationError {
        let account_id = cancellation.account_id().clone();
        let phase = CancellationPhase::Failed {
            message: message.clone(),
        };
        cancellation.set(phase.clone());
        self.publish(&account_id, phase);
        self.events.publish(BillingEvent::ErrorSet {
            account_id,
            message: message.clone(),
        });
        CancellationError::CancellationFailed(message)
    }

    fn publish(&self, account_id: &AccountId, phase: CancellationPhase) {
        self.events.publish(BillingEvent::CancellationChanged {
            account_id: account_id.clone(),
            phase,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MockAccountDataSource, MockEventSink, MockSubscriptionService,
    };
    use crate::domain::subscription::{Plan, SubscriptionStatus};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn quiet_sink() -> Arc<MockEventSink> {
        let mut sink = MockEventSink::new();
        sink.expect_publish().returning(|_| ());
        Arc::new(sink)
    }

    fn manager(
        accounts: MockAccountDataSource,
        subscriptions: MockSubscriptionService,
    ) -> SubscriptionManager {
        SubscriptionManager::new(
            Arc::new(accounts),
            Arc::new(subscriptions),
            quiet_sink(),
            BillingConfig::default(),
        )
    }

    fn accounts_returning(status: SubscriptionStatus) -> MockAccountDataSource {
        let mut accounts = MockAccountDataSource::new();
        accounts.expect_fetch_subscription().returning(move |_| {
            let mut sub = Subscription::active(Plan::from_key("team-v1"));
            sub.status = status;
            if status == SubscriptionStatus::Trialing {
                sub.trial_ends_at = Some(Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap());
            }
            Ok(sub)
        });
        accounts
    }

    #[test]
    fn test_describe_is_pure() {
        let sub = Subscription::trialing(
            Plan::from_key("team-v1"),
            Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap(),
        );
        assert_eq!(describe(&sub), describe(&sub));
        assert!(matches!(describe(&sub), DisplayState::TrialEnding { .. }));
    }

    #[tokio::test]
    async fn test_cancel_rejected_for_inactive_statuses() {
        for status in [SubscriptionStatus::None, SubscriptionStatus::Canceled] {
            let mut subscriptions = MockSubscriptionService::new();
            subscriptions.expect_cancel_subscription().times(0);
            let manager = manager(accounts_returning(status), subscriptions);
            let account: AccountId = "acct_1".into();

            let err = manager.cancel(&account).await.unwrap_err();
            assert_eq!(err, CancellationError::InvalidState { status });
            assert!(!manager.is_cancelling(&account));
        }
    }

    #[tokio::test]
    async fn test_cancel_accepted_for_running_statuses() {
        for status in [SubscriptionStatus::Active, SubscriptionStatus::Trialing] {
            let mut subscriptions = MockSubscriptionService::new();
            subscriptions
                .expect_cancel_subscription()
                .withf(|account_id| account_id.as_str() == "acct_1")
                .times(1)
                .returning(|_| Ok(()));
            let manager = manager(accounts_returning(status), subscriptions);
            let account: AccountId = "acct_1".into();

            manager.cancel(&account).await.unwrap();
            assert_eq!(
                manager.cancellation_phase(&account),
                CancellationPhase::Completed
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_state_keeps_previous_outcome() {
        let mut accounts = MockAccountDataSource::new();
        let mut seq = mockall::Sequence::new();
        accounts
            .expect_fetch_subscription()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Subscription::active(Plan::from_key("team-v1"))));
        accounts
            .expect_fetch_subscription()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                let mut sub = Subscription::active(Plan::from_key("team-v1"));
                sub.status = SubscriptionStatus::Canceled;
                Ok(sub)
            });
        let mut subscriptions = MockSubscriptionService::new();
        subscriptions
            .expect_cancel_subscription()
            .times(1)
            .returning(|_| Ok(()));
        let manager = manager(accounts, subscriptions);
        let account: AccountId = "acct_1".into();

        manager.cancel(&account).await.unwrap();
        let err = manager.cancel(&account).await.unwrap_err();

        assert!(matches!(err, CancellationError::InvalidState { .. }));
        assert_eq!(
            manager.cancellation_phase(&account),
            CancellationPhase::Completed
        );
        assert!(!manager.is_cancelling(&account));
    }

    #[tokio::test]
    async fn test_remote_rejection_message_is_kept() {
        let mut subscriptions = MockSubscriptionService::new();
        subscriptions.expect_cancel_subscription().returning(|_| {
            Err(ServiceError::Remote {
                message: "Subscription is locked by an open invoice.".to_string(),
            })
        });
        let manager = manager(accounts_returning(SubscriptionStatus::Active), subscriptions);

        let err = manager.cancel(&"acct_1".into()).await.unwrap_err();
        assert_eq!(
            err,
            CancellationError::CancellationFailed(
                "Subscription is locked by an open invoice.".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_transport_fault_uses_fallback() {
        let mut subscriptions = MockSubscriptionService::new();
        subscriptions
            .expect_cancel_subscription()
            .returning(|_| Err(ServiceError::Transport("socket closed".to_string())));
        let manager = manager(accounts_returning(SubscriptionStatus::Active), subscriptions);
        let account: AccountId = "acct_1".into();

        let err = manager.cancel(&account).await.unwrap_err();
        assert_eq!(
            err.user_message(),
            Some(BillingConfig::default().cancellation_fallback_message.as_str())
        );
        assert!(matches!(
            manager.cancellation_phase(&account),
            CancellationPhase::Failed { .. }
        ));
        assert!(!manager.is_cancelling(&account));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_cancellation_failed() {
        let mut accounts = MockAccountDataSource::new();
        accounts
            .expect_fetch_subscription()
            .returning(|_| Err(ServiceError::Unavailable("503".to_string())));
        let mut subscriptions = MockSubscriptionService::new();
        subscriptions.expect_cancel_subscription().times(0);
        let manager = manager(accounts, subscriptions);

        let err = manager.cancel(&"acct_1".into()).await.unwrap_err();
        assert!(matches!(err, CancellationError::CancellationFailed(_)));
    }

    #[tokio::test]
    async fn test_refresh_publishes_status() {
        let mut sink = MockEventSink::new();
        sink.expect_publish()
            .withf(|event| {
                matches!(
                    event,
                    BillingEvent::SubscriptionRefreshed {
                        status: SubscriptionStatus::Active,
                        ..
                    }
                )
            })
            .times(1)
            .returning(|_| ());
        let manager = SubscriptionManager::new(
            Arc::new(accounts_returning(SubscriptionStatus::Active)),
            Arc::new(MockSubscriptionService::new()),
            Arc::new(sink),
            BillingConfig::default(),
        );

        let sub = manager.refresh(&"acct_1".into()).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }
}
