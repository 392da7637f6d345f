use serde::Serialize;

use crate::{
    common::types::{ChatId, Epoch},
    protocol::tracks::{QueueEntry, Track},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    Idle,
    Playing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub track: Track,
    pub elapsed_secs: u64,
    /// Scheduling length, with the default applied for unknown durations.
    pub total_secs: u64,
    pub paused: bool,
}

/// Read-only copy of a chat's session, safe to hand to other components.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub chat_id: ChatId,
    pub state: PlaybackState,
    pub active: bool,
    pub now_playing: Option<NowPlaying>,
    pub queue: Vec<QueueEntry>,
    pub loop_remaining: u32,
    pub epoch: Epoch,
}

/// Result of an enqueue request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum EnqueueOutcome {
    /// The chat was idle and the track started immediately.
    Started,
    Queued { position: usize },
}
