use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card network reported by the gateway.
///
/// Unrecognized networks are kept as-is so they round-trip, but render with
/// the generic "Card" label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CardBrand {
    Visa,
    Amex,
    Diners,
    Jcb,
    Mastercard,
    Other(String),
}

impl CardBrand {
    /// Human-readable label shown next to the last four digits.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Visa => "Visa",
            Self::Amex => "American Express",
            Self::Diners => "Diners Club",
            Self::Jcb => "JCB",
            Self::Mastercard => "Mastercard",
            Self::Other(_) => "Card",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Visa => "visa",
            Self::Amex => "amex",
            Self::Diners => "diners",
            Self::Jcb => "jcb",
            Self::Mastercard => "mastercard",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for CardBrand {
    fn from(raw: &str) -> Self {
        match raw {
            "visa" => Self::Visa,
            "amex" => Self::Amex,
            "diners" => Self::Diners,
            "jcb" => Self::Jcb,
            "mastercard" => Self::Mastercard,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for CardBrand {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<CardBrand> for String {
    fn from(brand: CardBrand) -> Self {
        brand.as_str().to_string()
    }
}

/// A card bound to an account.
///
/// Only the account service creates these; the core reads them back after a
/// successful provisioning attempt and never edits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub brand: CardBrand,
    pub last4: String,
}

impl PaymentMethod {
    pub fn new(
        id: impl Into<String>,
        brand: CardBrand,
        last4: impl Into<String>,
    ) -> Result<Self, InputError> {
        let last4 = last4.into();
        if last4.len() != 4 || !last4.chars().all(|c| c.is_ascii_digit()) {
            return Err(InputError::InvalidLast4(last4));
        }
        Ok(Self {
            id: id.into(),
            brand,
            last4,
        })
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ending with {}", self.brand.label(), self.last4)
    }
}
