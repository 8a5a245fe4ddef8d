use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// User-facing fallback messages.
///
/// Transport faults are never shown verbatim; one of these is shown instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BillingConfig {
    pub provisioning_fallback_message: String,
    pub cancellation_fallback_message: String,
    pub refresh_failed_message: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            provisioning_fallback_message:
                "Failed to create payment method. Please try again later.".to_string(),
            cancellation_fallback_message:
                "Failed to cancel subscription. Please try again later.".to_string(),
            refresh_failed_message:
                "Your card was saved but the billing details could not be refreshed. Please reload."
                    .to_string(),
        }
    }
}

impl BillingConfig {
    /// Reads a JSON config. Missing keys keep their defaults.
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}
