use serde::Serialize;

use crate::{
    common::{Severity, types::ChatId},
    protocol::tracks::{Requester, Track},
};

/// Notifications emitted by the scheduler for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SchedulerEvent {
    #[serde(rename = "NowPlayingEvent")]
    NowPlaying {
        #[serde(rename = "chatId")]
        chat_id: ChatId,
        track: Track,
        #[serde(rename = "requestedBy")]
        requested_by: Requester,
    },

    #[serde(rename = "QueuedEvent")]
    QueuedAt {
        #[serde(rename = "chatId")]
        chat_id: ChatId,
        track: Track,
        /// 1-based.
        position: usize,
    },

    #[serde(rename = "QueueFinishedEvent")]
    QueueFinished {
        #[serde(rename = "chatId")]
        chat_id: ChatId,
    },

    #[serde(rename = "TrackFailedEvent")]
    TrackFailed {
        #[serde(rename = "chatId")]
        chat_id: ChatId,
        track: Track,
        reason: String,
        severity: Severity,
    },
}

impl SchedulerEvent {
    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::NowPlaying { chat_id, .. }
            | Self::QueuedAt { chat_id, .. }
            | Self::QueueFinished { chat_id }
            | Self::TrackFailed { chat_id, .. } => *chat_id,
        }
    }
}
