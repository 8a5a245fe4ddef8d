use crate::domain::account::BillingAccount;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;

/// One seeded account plus the end of its current billing period.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFixture {
    #[serde(flatten)]
    pub account: BillingAccount,
    #[serde(default)]
    pub period_ends_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct FixtureFile {
    accounts: Vec<AccountFixture>,
}

/// Reads billing account fixtures from a JSON source.
pub struct FixtureReader<R: Read> {
    source: R,
}

impl<R: Read> FixtureReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn accounts(self) -> Result<Vec<AccountFixture>> {
        let file: FixtureFile = serde_json::from_reader(self.source)?;
        Ok(file.accounts)
    }
}
