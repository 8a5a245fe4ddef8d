use crate::domain::account::AccountId;
use crate::domain::display::SubscriptionOverview;
use crate::domain::events::BillingEvent;
use crate::domain::payment_method::PaymentMethod;
use crate::domain::subscription::Subscription;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// State of one account after a command, as printed by the demo binary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReport {
    pub account_id: AccountId,
    pub subscription: Subscription,
    pub overview: SubscriptionOverview,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<BillingEvent>,
}

pub struct ReportWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_report(&mut self, report: &AccountReport) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, report)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
