use async_trait::async_trait;
use tracing::debug;

use crate::protocol::events::SchedulerEvent;

/// Receives scheduler notifications. Formatting is the consumer's business.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: SchedulerEvent);
}

/// Forwards notifications into a `flume` channel.
#[derive(Clone)]
pub struct ChannelSink {
    sender: flume::Sender<SchedulerEvent>,
}

impl ChannelSink {
    pub fn new(sender: flume::Sender<SchedulerEvent>) -> Self {
        Self { sender }
    }

    /// Sink plus the receiving end of an unbounded channel.
    pub fn unbounded() -> (Self, flume::Receiver<SchedulerEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn notify(&self, event: SchedulerEvent) {
        if let Err(e) = self.sender.send_async(event).await {
            debug!("Dropping notification, no listener: {:?}", e.into_inner());
        }
    }
}
