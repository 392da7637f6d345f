use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use super::{StreamController, StreamRequest, TransportEvent};
use crate::common::{errors::TransportError, types::ChatId};

/// One call made against the transport, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Join(ChatId),
    Start(StreamRequest),
    Switch(StreamRequest),
    Stop(ChatId),
    Pause(ChatId),
    Resume(ChatId),
}

impl TransportCall {
    pub fn media_ref(&self) -> Option<&str> {
        match self {
            Self::Start(r) | Self::Switch(r) => Some(&r.media_ref),
            _ => None,
        }
    }
}

#[derive(Default)]
struct LoopbackState {
    calls: Vec<TransportCall>,
    streams: HashMap<ChatId, StreamRequest>,
    /// Starts issued while a stream was already live for the chat.
    overlaps: u32,
    failing_starts: u32,
    failing_stops: u32,
}

/// In-process transport that streams nothing. It records every call, tracks
/// which chats hold a live stream, and can be told to fail.
#[derive(Clone)]
pub struct LoopbackController {
    state: Arc<Mutex<LoopbackState>>,
    supports_switch: bool,
    events: Option<flume::Sender<TransportEvent>>,
}

impl LoopbackController {
    pub fn new(supports_switch: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(LoopbackState::default())),
            supports_switch,
            events: None,
        }
    }

    pub fn with_events(mut self, events: flume::Sender<TransportEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// The next `n` start/switch calls fail.
    pub fn fail_next_starts(&self, n: u32) {
        self.state.lock().failing_starts = n;
    }

    pub fn fail_next_stops(&self, n: u32) {
        self.state.lock().failing_stops = n;
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().calls.clone()
    }

    /// Media refs of every start/switch, in order.
    pub fn played(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| c.media_ref().map(str::to_string))
            .collect()
    }

    pub fn overlaps(&self) -> u32 {
        self.state.lock().overlaps
    }

    pub fn live_stream(&self, chat_id: ChatId) -> Option<StreamRequest> {
        self.state.lock().streams.get(&chat_id).cloned()
    }

    /// Simulates end-of-media for the chat's live stream, echoing its epoch.
    pub fn finish(&self, chat_id: ChatId) -> bool {
        let Some(stream) = self.state.lock().streams.get(&chat_id).cloned() else {
            return false;
        };
        match &self.events {
            Some(tx) => tx
                .send(TransportEvent::StreamEnded {
                    chat_id,
                    epoch: Some(stream.epoch),
                })
                .is_ok(),
            None => false,
        }
    }

    fn take_failure(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl StreamController for LoopbackController {
    async fn join(&self, chat_id: ChatId) -> Result<(), TransportError> {
        tokio::task::yield_now().await;
        self.state.lock().calls.push(TransportCall::Join(chat_id));
        info!("[{}] loopback: joined call", chat_id);
        Ok(())
    }

    async fn start(&self, request: &StreamRequest) -> Result<(), TransportError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.calls.push(TransportCall::Start(request.clone()));
        if Self::take_failure(&mut state.failing_starts) {
            return Err(TransportError::Failed(format!(
                "cannot open {}",
                request.media_ref
            )));
        }
        if state.streams.contains_key(&request.chat_id) {
            state.overlaps += 1;
        }
        state.streams.insert(request.chat_id, request.clone());
        info!(
            "[{}] loopback: streaming {} at {}s ({})",
            request.chat_id, request.media_ref, request.offset_secs, request.epoch
        );
        Ok(())
    }

    async fn switch(&self, request: &StreamRequest) -> Result<(), TransportError> {
        if !self.supports_switch {
            return Err(TransportError::Unsupported);
        }
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.calls.push(TransportCall::Switch(request.clone()));
        if Self::take_failure(&mut state.failing_starts) {
            return Err(TransportError::Failed(format!(
                "cannot switch to {}",
                request.media_ref
            )));
        }
        state.streams.insert(request.chat_id, request.clone());
        info!(
            "[{}] loopback: switched to {} ({})",
            request.chat_id, request.media_ref, request.epoch
        );
        Ok(())
    }

    async fn stop(&self, chat_id: ChatId) -> Result<(), TransportError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.calls.push(TransportCall::Stop(chat_id));
        if Self::take_failure(&mut state.failing_stops) {
            return Err(TransportError::Failed("stop rejected".into()));
        }
        state.streams.remove(&chat_id);
        info!("[{}] loopback: stopped", chat_id);
        Ok(())
    }

    async fn pause(&self, chat_id: ChatId) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.streams.contains_key(&chat_id) {
            return Err(TransportError::NotInCall(chat_id));
        }
        state.calls.push(TransportCall::Pause(chat_id));
        Ok(())
    }

    async fn resume(&self, chat_id: ChatId) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.streams.contains_key(&chat_id) {
            return Err(TransportError::NotInCall(chat_id));
        }
        state.calls.push(TransportCall::Resume(chat_id));
        Ok(())
    }
}
