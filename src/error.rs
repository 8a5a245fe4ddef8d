use crate::domain::account::AccountId;
use crate::domain::attempt::FailureKind;
use crate::domain::subscription::SubscriptionStatus;
use thiserror::Error;

/// Crate-level error for fixtures, configuration and the demo binary.
#[derive(Error, Debug)]
pub enum BillingError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),
    #[error("Unknown billing account: {0}")]
    UnknownAccount(AccountId),
}

pub type Result<T> = std::result::Result<T, BillingError>;

/// A fault reported by one of the remote collaborators behind a port.
///
/// `Remote` carries a message the remote side meant for the user; the other
/// variants are transport-level and are never shown verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("{message}")]
    Remote { message: String },
}

/// Outcome of a failed `begin_provisioning` call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    #[error("{0}")]
    SecretUnavailable(String),
    #[error("{0}")]
    GatewayRejected(String),
    #[error("a payment method is already being added to this account")]
    AlreadyInProgress,
    #[error("{0}")]
    RefreshFailed(String),
}

impl ProvisioningError {
    /// The failure kind recorded on the attempt, if this error ends one.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::SecretUnavailable(_) => Some(FailureKind::SecretUnavailable),
            Self::GatewayRejected(_) => Some(FailureKind::GatewayRejected),
            Self::RefreshFailed(_) => Some(FailureKind::RefreshFailed),
            Self::AlreadyInProgress => None,
        }
    }

    /// Message for an error banner. Duplicate submissions are suppressed
    /// silently, so `AlreadyInProgress` has none.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::SecretUnavailable(message)
            | Self::GatewayRejected(message)
            | Self::RefreshFailed(message) => Some(message),
            Self::AlreadyInProgress => None,
        }
    }
}

/// Outcome of a failed `cancel` call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancellationError {
    #[error("a cancellation is already in progress for this account")]
    AlreadyInProgress,
    #[error("{0}")]
    CancellationFailed(String),
    #[error("cannot cancel a subscription with status `{status}`")]
    InvalidState { status: SubscriptionStatus },
}

impl CancellationError {
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::CancellationFailed(message) => Some(message),
            Self::AlreadyInProgress | Self::InvalidState { .. } => None,
        }
    }
}

/// Caller-side validation failures for values handed to the core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("card capture handle is empty")]
    EmptyCardHandle,
    #[error("required billing field `{0}` is empty")]
    MissingField(&'static str),
    #[error("last four digits must be exactly four digits, got `{0}`")]
    InvalidLast4(String),
}
