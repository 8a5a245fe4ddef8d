use super::guard::{InFlightGuard, InFlightRegistry};
use crate::config::BillingConfig;
use crate::domain::account::AccountId;
use crate::domain::attempt::{OperationPhase, ProvisioningPhase};
use crate::domain::billing_details::{BillingDetails, CardHandle};
use crate::domain::events::BillingEvent;
use crate::domain::payment_method::PaymentMethod;
use crate::domain::ports::{
    AccountDataSourceRef, CardGatewayRef, EventSinkRef, ProvisioningServiceRef, SetupOutcome,
};
use crate::error::ProvisioningError;
use tracing::{debug, info, warn};

/// Binds a card to a billing account.
///
/// Each attempt requests a one-time secret from the provisioning service,
/// confirms the card with the gateway using that secret, then re-reads the
/// account to get the stored card. At most one attempt runs per account;
/// attempts for different accounts never wait on each other.
pub struct PaymentMethodCoordinator {
    provisioning: ProvisioningServiceRef,
    gateway: CardGatewayRef,
    accounts: AccountDataSourceRef,
    events: EventSinkRef,
    attempts: InFlightRegistry<ProvisioningPhase>,
    config: BillingConfig,
}

impl PaymentMethodCoordinator {
    pub fn new(
        provisioning: ProvisioningServiceRef,
        gateway: CardGatewayRef,
        accounts: AccountDataSourceRef,
        events: EventSinkRef,
        config: BillingConfig,
    ) -> Self {
        let attempts = InFlightRegistry::new(config.provisioning_fallback_message.clone());
        Self {
            provisioning,
            gateway,
            accounts,
            events,
            attempts,
            config,
        }
    }

    /// Phase of the latest attempt for the account.
    pub fn phase(&self, account_id: &AccountId) -> ProvisioningPhase {
        self.attempts.phase(account_id)
    }

    pub fn is_in_flight(&self, account_id: &AccountId) -> bool {
        self.phase(account_id).is_in_flight()
    }

    /// Runs one provisioning attempt to completion.
    ///
    /// Returns the card the gateway confirmed, as read back from the account
    /// service. Nothing is retried
    /// automatically: after a failure the caller starts a new attempt.
    ///
    /// # Errors
    ///
    /// - [`ProvisioningError::AlreadyInProgress`] if an attempt for the account
    ///   is running; no remote call is made.
    /// - [`ProvisioningError::SecretUnavailable`] if no secret could be obtained;
    ///   the gateway is not contacted.
    /// - [`ProvisioningError::GatewayRejected`] with the gateway's message when it
    ///   declines, or the fallback message on a transport fault.
    /// - [`ProvisioningError::RefreshFailed`] if the card was confirmed but the
    ///   account could not be read back or does not list it as active.
    pub async fn begin_provisioning(
        &self,
        account_id: &AccountId,
        card: CardHandle,
        billing_details: BillingDetails,
    ) -> Result<PaymentMethod, ProvisioningError> {
        let Some(mut attempt) = self
            .attempts
            .try_begin(account_id, ProvisioningPhase::RequestingSecret)
        else {
            debug!(%account_id, "provisioning: attempt already in flight, ignoring submission");
            return Err(ProvisioningError::AlreadyInProgress);
        };
        self.publish_phase(account_id, ProvisioningPhase::RequestingSecret);

        info!(%account_id, "provisioning: requesting secret");
        let secret = match self.provisioning.request_provisioning_secret(account_id).await {
            Ok(response) => response.into_secret(),
            Err(err) => {
                warn!(%account_id, error = %err, "provisioning: secret request failed");
                None
            }
        };
        let Some(secret) = secret else {
            warn!(%account_id, "provisioning: no secret issued, skipping gateway");
            return Err(self.fail(
                &mut attempt,
                ProvisioningError::SecretUnavailable(
                    self.config.provisioning_fallback_message.clone(),
                ),
            ));
        };

        self.advance(&mut attempt, ProvisioningPhase::ConfirmingWithGateway);
        info!(%account_id, "provisioning: confirming card setup with gateway");
        let payment_method_id = match self
            .gateway
            .confirm_card_setup(&secret, &card, &billing_details)
            .await
        {
            Ok(SetupOutcome::Confirmed { payment_method_id }) => payment_method_id,
            Ok(SetupOutcome::Declined { message }) => {
                info!(%account_id, %message, "provisioning: gateway declined card");
                let message = if message.trim().is_empty() {
                    self.config.provisioning_fallback_message.clone()
                } else {
                    message
                };
                return Err(self.fail(&mut attempt, ProvisioningError::GatewayRejected(message)));
            }
            Err(err) => {
                warn!(%account_id, error = %err, "provisioning: gateway call failed");
                return Err(self.fail(
                    &mut attempt,
                    ProvisioningError::GatewayRejected(
                        self.config.provisioning_fallback_message.clone(),
                    ),
                ));
            }
        };

        // The account service owns brand and last4; read them back.
        let refreshed = match self.accounts.fetch_subscription(account_id).await {
            Ok(subscription) => {
                self.events.publish(BillingEvent::SubscriptionRefreshed {
                    account_id: account_id.clone(),
                    status: subscription.status,
                });
                let method = subscription
                    .active_payment_methods()
                    .iter()
                    .find(|method| method.id == payment_method_id)
                    .cloned();
                if method.is_none() {
                    warn!(%account_id, %payment_method_id, "provisioning: confirmed card missing from refreshed account");
                }
                method
            }
            Err(err) => {
                warn!(%account_id, error = %err, "provisioning: refresh after confirmation failed");
                None
            }
        };
        let Some(method) = refreshed else {
            return Err(self.fail(
                &mut attempt,
                ProvisioningError::RefreshFailed(self.config.refresh_failed_message.clone()),
            ));
        };

        info!(%account_id, payment_method = %method.id, "provisioning: card added");
        self.advance(
            &mut attempt,
            ProvisioningPhase::Succeeded {
                method: method.clone(),
            },
        );
        Ok(method)
    }

    fn advance(&self, attempt: &mut InFlightGuard<ProvisioningPhase>, next: ProvisioningPhase) {
        debug_assert!(
            self.attempts
                .phase(attempt.account_id())
                .can_advance_to(&next),
            "illegal provisioning transition to {next:?}"
        );
        attempt.set(next.clone());
        self.publish_phase(attempt.account_id(), next);
    }

    fn fail(
        &self,
        attempt: &mut InFlightGuard<ProvisioningPhase>,
        error: ProvisioningError,
    ) -> ProvisioningError {
        if let (Some(kind), Some(message)) = (error.kind(), error.user_message()) {
            self.advance(attempt, ProvisioningPhase::failed(kind, message));
            self.events.publish(BillingEvent::ErrorSet {
                account_id: attempt.account_id().clone(),
                message: message.to_string(),
            });
        }
        error
    }

    fn publish_phase(&self, account_id: &AccountId, phase: ProvisioningPhase) {
        debug!(%account_id, ?phase, "provisioning: phase changed");
        self.events.publish(BillingEvent::PhaseChanged {
            account_id: account_id.clone(),
            phase,
        });
    }
}
