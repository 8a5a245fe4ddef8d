use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to card details captured by the gateway's own input widget.
///
/// The core never sees card numbers, only this handle, and never logs it.
#[derive(Clone, PartialEq, Eq)]
pub struct CardHandle(String);

impl CardHandle {
    pub fn new(handle: impl Into<String>) -> Result<Self, InputError> {
        let handle = handle.into();
        if handle.trim().is_empty() {
            return Err(InputError::EmptyCardHandle);
        }
        Ok(Self(handle))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CardHandle(<redacted>)")
    }
}

/// One-time secret issued by the provisioning service for a single attempt.
///
/// Only constructible from a non-blank value, so a gateway confirmation can
/// never be issued without a secret in hand.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisioningSecret(String);

impl ProvisioningSecret {
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        (!secret.trim().is_empty()).then_some(Self(secret))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProvisioningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProvisioningSecret(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

/// Cardholder name and postal address forwarded to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillingDetails {
    pub name: String,
    pub address: Address,
}

impl BillingDetails {
    /// Checks that every required field is filled in. Callers run this before
    /// submitting; the coordinator forwards details without re-checking.
    pub fn validate(&self) -> Result<(), InputError> {
        let required = [
            ("name", &self.name),
            ("line1", &self.address.line1),
            ("city", &self.address.city),
            ("state", &self.address.state),
            ("postalCode", &self.address.postal_code),
            ("country", &self.address.country),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(InputError::MissingField(*field)),
            None => Ok(()),
        }
    }
}
