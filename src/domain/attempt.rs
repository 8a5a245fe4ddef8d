//! Phases of the per-account operations driven by the application layer.
//!
//! ```text
//! Idle ──► RequestingSecret ──► ConfirmingWithGateway ──► Succeeded
//!                 │                       │
//!                 ▼                       ▼
//!       Failed(SecretUnavailable)  Failed(GatewayRejected | RefreshFailed)
//! ```
//!
//! `Failed` and `Succeeded` end an attempt; the next attempt starts again at
//! `RequestingSecret`.

use super::payment_method::PaymentMethod;
use serde::Serialize;

/// Common behaviour of a phase tracked by the in-flight registry.
pub trait OperationPhase: Clone + Send + 'static {
    /// Whether an operation in this phase holds the account's guard.
    fn is_in_flight(&self) -> bool;

    /// Phase to record when an in-flight operation ends without reaching a
    /// terminal phase (its future was dropped or it panicked).
    fn interrupted(&self, message: &str) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    SecretUnavailable,
    GatewayRejected,
    RefreshFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum ProvisioningPhase {
    #[default]
    Idle,
    RequestingSecret,
    ConfirmingWithGateway,
    Failed {
        kind: FailureKind,
        message: String,
    },
    Succeeded {
        method: PaymentMethod,
    },
}

impl ProvisioningPhase {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Succeeded { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Whether `next` is a legal successor of this phase.
    pub fn can_advance_to(&self, next: &Self) -> bool {
        use FailureKind::*;
        match (self, next) {
            (Self::Idle | Self::Failed { .. } | Self::Succeeded { .. }, Self::RequestingSecret) => {
                true
            }
            (Self::RequestingSecret, Self::ConfirmingWithGateway) => true,
            (
                Self::RequestingSecret,
                Self::Failed {
                    kind: SecretUnavailable,
                    ..
                },
            ) => true,
            (
                Self::ConfirmingWithGateway,
                Self::Failed {
                    kind: GatewayRejected | RefreshFailed,
                    ..
                },
            ) => true,
            (Self::ConfirmingWithGateway, Self::Succeeded { .. }) => true,
            _ => false,
        }
    }
}

impl OperationPhase for ProvisioningPhase {
    fn is_in_flight(&self) -> bool {
        matches!(self, Self::RequestingSecret | Self::ConfirmingWithGateway)
    }

    fn interrupted(&self, message: &str) -> Self {
        match self {
            Self::RequestingSecret => Self::failed(FailureKind::SecretUnavailable, message),
            Self::ConfirmingWithGateway => Self::failed(FailureKind::GatewayRejected, message),
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum CancellationPhase {
    #[default]
    Idle,
    InFlight,
    Failed {
        message: String,
    },
    Completed,
}

impl OperationPhase for CancellationPhase {
    fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    fn interrupted(&self, message: &str) -> Self {
        match self {
            Self::InFlight => Self::Failed {
                message: message.to_string(),
            },
            other => other.clone(),
        }
    }
}
