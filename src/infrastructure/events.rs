use crate::domain::events::BillingEvent;
use crate::domain::ports::EventSink;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

/// Forwards events to a channel read by the presentation layer.
#[derive(Clone)]
pub struct ChannelEventSink {
    sender: UnboundedSender<BillingEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, UnboundedReceiver<BillingEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn publish(&self, event: BillingEvent) {
        if self.sender.send(event).is_err() {
            debug!("billing events: receiver dropped, event discarded");
        }
    }
}

/// Writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: BillingEvent) {
        info!(account_id = %event.account_id(), ?event, "billing event");
    }
}
