use crate::domain::account::{AccountId, BillingAccount};
use crate::domain::billing_details::{BillingDetails, CardHandle, ProvisioningSecret};
use crate::domain::payment_method::{CardBrand, PaymentMethod};
use crate::domain::ports::{
    AccountDataSource, CardGateway, ProvisioningService, SecretResponse, SetupOutcome,
    SubscriptionService,
};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::error::ServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// A remote call received by the in-memory backend, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    RequestSecret(AccountId),
    ConfirmSetup { secret: String },
    FetchSubscription(AccountId),
    CancelSubscription(AccountId),
}

/// One-shot failure to inject into the next matching call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    SecretTransport,
    SecretMissing,
    GatewayTransport,
    FetchTransport,
    CancelTransport,
    CancelRejected(String),
}

struct SecretRecord {
    account_id: AccountId,
    used: bool,
}

struct AccountRecord {
    account: BillingAccount,
    period_ends_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, AccountRecord>,
    secrets: HashMap<String, SecretRecord>,
    queued_secrets: VecDeque<String>,
    faults: Vec<Fault>,
    calls: Vec<BackendCall>,
    next_id: u64,
}

impl State {
    fn take_fault(&mut self, matches: impl Fn(&Fault) -> bool) -> Option<Fault> {
        let index = self.faults.iter().position(matches)?;
        Some(self.faults.remove(index))
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Test cards understood by the simulated gateway, keyed by capture handle.
fn test_card(handle: &str) -> Result<(CardBrand, &'static str), &'static str> {
    match handle {
        "tok_visa" => Ok((CardBrand::Visa, "4242")),
        "tok_mastercard" => Ok((CardBrand::Mastercard, "4444")),
        "tok_amex" => Ok((CardBrand::Amex, "8431")),
        "tok_diners" => Ok((CardBrand::Diners, "0004")),
        "tok_jcb" => Ok((CardBrand::Jcb, "0505")),
        "tok_unionpay" => Ok((CardBrand::Other("unionpay".to_string()), "0005")),
        "tok_chargeDeclined" => Err("Your card was declined."),
        "tok_insufficientFunds" => Err("Your card has insufficient funds."),
        _ => Err("Your card number is incorrect."),
    }
}

/// Simulated billing backend implementing every remote port.
///
/// Stands in for the provisioning service, the gateway and the account
/// service at once, so the gateway can append the confirmed card to the
/// account it was provisioned for. Every call is recorded.
#[derive(Default, Clone)]
pub struct InMemoryBillingBackend {
    state: Arc<RwLock<State>>,
    latency: Duration,
}

impl InMemoryBillingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fixed delay to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Adds or replaces an account. Cancelling an active subscription ends it
    /// at `period_ends_at` (thirty days out when not given).
    pub async fn insert_account(
        &self,
        account: BillingAccount,
        period_ends_at: Option<DateTime<Utc>>,
    ) {
        let period_ends_at =
            period_ends_at.unwrap_or_else(|| Utc::now() + ChronoDuration::days(30));
        let mut state = self.state.write().await;
        state.accounts.insert(
            account.id.clone(),
            AccountRecord {
                account,
                period_ends_at,
            },
        );
    }

    pub async fn account(&self, account_id: &AccountId) -> Option<BillingAccount> {
        let state = self.state.read().await;
        state
            .accounts
            .get(account_id)
            .map(|record| record.account.clone())
    }

    /// The next secret issued will be exactly `secret`.
    pub async fn queue_secret(&self, secret: impl Into<String>) {
        self.state.write().await.queued_secrets.push_back(secret.into());
    }

    pub async fn fail_next(&self, fault: Fault) {
        self.state.write().await.faults.push(fault);
    }

    pub async fn calls(&self) -> Vec<BackendCall> {
        self.state.read().await.calls.clone()
    }

    async fn record(&self, call: BackendCall) {
        self.state.write().await.calls.push(call);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn unknown_account(account_id: &AccountId) -> ServiceError {
    ServiceError::Remote {
        message: format!("No billing account `{account_id}`."),
    }
}

#[async_trait]
impl ProvisioningService for InMemoryBillingBackend {
    async fn request_provisioning_secret(
        &self,
        account_id: &AccountId,
    ) -> Result<SecretResponse, ServiceError> {
        self.record(BackendCall::RequestSecret(account_id.clone()))
            .await;
        let mut state = self.state.write().await;
        match state.take_fault(|f| matches!(f, Fault::SecretTransport | Fault::SecretMissing)) {
            Some(Fault::SecretTransport) => {
                return Err(ServiceError::Transport("connection reset by peer".to_string()));
            }
            Some(_) => return Ok(SecretResponse::default()),
            None => {}
        }
        if !state.accounts.contains_key(account_id) {
            return Err(unknown_account(account_id));
        }
        let queued = state.queued_secrets.pop_front();
        let secret = match queued {
            Some(secret) => secret,
            None => format!("seti_{}_secret", state.next_id()),
        };
        state.secrets.insert(
            secret.clone(),
            SecretRecord {
                account_id: account_id.clone(),
                used: false,
            },
        );
        Ok(SecretResponse::with_secret(secret))
    }
}

#[async_trait]
impl CardGateway for InMemoryBillingBackend {
    async fn confirm_card_setup(
        &self,
        secret: &ProvisioningSecret,
        card: &CardHandle,
        _billing_details: &BillingDetails,
    ) -> Result<SetupOutcome, ServiceError> {
        self.record(BackendCall::ConfirmSetup {
            secret: secret.expose().to_string(),
        })
        .await;
        let mut state = self.state.write().await;
        if state
            .take_fault(|f| matches!(f, Fault::GatewayTransport))
            .is_some()
        {
            return Err(ServiceError::Transport("gateway timed out".to_string()));
        }

        let account_id = match state.secrets.get_mut(secret.expose()) {
            None => {
                return Ok(SetupOutcome::Declined {
                    message: "No such setup intent.".to_string(),
                });
            }
            Some(record) if record.used => {
                return Ok(SetupOutcome::Declined {
                    message: "This setup intent has already been used.".to_string(),
                });
            }
            Some(record) => {
                record.used = true;
                record.account_id.clone()
            }
        };

        let (brand, last4) = match test_card(card.expose()) {
            Ok(card) => card,
            Err(message) => {
                return Ok(SetupOutcome::Declined {
                    message: message.to_string(),
                });
            }
        };
        let id = format!("pm_{}", state.next_id());
        let method = PaymentMethod::new(id.clone(), brand, last4).map_err(|err| ServiceError::Remote {
            message: err.to_string(),
        })?;
        let record = state
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| unknown_account(&account_id))?;
        record.account.subscription.payment_methods.push(method);
        Ok(SetupOutcome::Confirmed {
            payment_method_id: id,
        })
    }
}

#[async_trait]
impl AccountDataSource for InMemoryBillingBackend {
    async fn fetch_subscription(
        &self,
        account_id: &AccountId,
    ) -> Result<Subscription, ServiceError> {
        self.record(BackendCall::FetchSubscription(account_id.clone()))
            .await;
        let mut state = self.state.write().await;
        if state
            .take_fault(|f| matches!(f, Fault::FetchTransport))
            .is_some()
        {
            return Err(ServiceError::Unavailable("account service returned 503".to_string()));
        }
        state
            .accounts
            .get(account_id)
            .map(|record| record.account.subscription.clone())
            .ok_or_else(|| unknown_account(account_id))
    }
}

#[async_trait]
impl SubscriptionService for InMemoryBillingBackend {
    async fn cancel_subscription(&self, account_id: &AccountId) -> Result<(), ServiceError> {
        self.record(BackendCall::CancelSubscription(account_id.clone()))
            .await;
        let mut state = self.state.write().await;
        match state.take_fault(|f| matches!(f, Fault::CancelTransport | Fault::CancelRejected(_))) {
            Some(Fault::CancelRejected(message)) => return Err(ServiceError::Remote { message }),
            Some(_) => return Err(ServiceError::Transport("broken pipe".to_string())),
            None => {}
        }
        let record = state
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| unknown_account(account_id))?;
        let subscription = &mut record.account.subscription;
        let effective_until = match subscription.status {
            SubscriptionStatus::Active => record.period_ends_at,
            SubscriptionStatus::Trialing => subscription
                .trial_ends_at
                .unwrap_or(record.period_ends_at),
            SubscriptionStatus::None | SubscriptionStatus::Canceled => {
                return Err(ServiceError::Remote {
                    message: "Subscription is not active.".to_string(),
                });
            }
        };
        subscription.status = SubscriptionStatus::Canceled;
        subscription.trial_ends_at = None;
        subscription.effective_until = Some(effective_until);
        Ok(())
    }
}
