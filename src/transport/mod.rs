use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    common::{
        errors::TransportError,
        types::{ChatId, Epoch},
    },
    scheduler::Scheduler,
};

pub mod loopback;

pub use loopback::{LoopbackController, TransportCall};

/// What to stream into a chat's call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub chat_id: ChatId,
    pub media_ref: String,
    pub video: bool,
    /// Epoch the request was issued under. Transports that can should echo it
    /// back in `TransportEvent::StreamEnded`.
    pub epoch: Epoch,
    /// Start position; non-zero only for seeks.
    pub offset_secs: u64,
}

/// The voice transport. Implementations must not call back into the scheduler
/// synchronously; events go through the channel consumed by
/// [`spawn_event_pump`].
#[async_trait]
pub trait StreamController: Send + Sync {
    /// Joins the chat's voice call.
    async fn join(&self, _chat_id: ChatId) -> Result<(), TransportError> {
        Ok(())
    }

    async fn start(&self, request: &StreamRequest) -> Result<(), TransportError>;

    /// Replaces the active stream without leaving the call.
    async fn switch(&self, _request: &StreamRequest) -> Result<(), TransportError> {
        Err(TransportError::Unsupported)
    }

    async fn stop(&self, chat_id: ChatId) -> Result<(), TransportError>;

    async fn pause(&self, chat_id: ChatId) -> Result<(), TransportError>;

    async fn resume(&self, chat_id: ChatId) -> Result<(), TransportError>;

    /// Leaves the call. Transports without an explicit disconnect just stop.
    async fn leave(&self, chat_id: ChatId) -> Result<(), TransportError> {
        self.stop(chat_id).await
    }
}

/// Asynchronous notifications from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// End of media. Delivery is not guaranteed and may be duplicated.
    StreamEnded {
        chat_id: ChatId,
        epoch: Option<Epoch>,
    },
    /// The call went away underneath us (kicked, call ended).
    Left { chat_id: ChatId },
}

/// Forwards transport events into the scheduler until every sender is gone.
pub fn spawn_event_pump(
    scheduler: Scheduler,
    events: flume::Receiver<TransportEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(event) = events.recv_async().await {
            debug!("Transport event: {:?}", event);
            match event {
                TransportEvent::StreamEnded { chat_id, epoch } => {
                    scheduler.on_stream_ended(chat_id, epoch).await;
                }
                TransportEvent::Left { chat_id } => {
                    scheduler.on_left(chat_id).await;
                }
            }
        }
        info!("Transport event pump stopped");
    })
}
