use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::types::{UserId, now_ms};

/// Who asked for a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub id: UserId,
    pub display_name: String,
}

impl Requester {
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// One playable item. Built by a resolver and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    /// Opaque handle the stream controller knows how to play.
    pub media_ref: String,
    /// External catalog id, e.g. a video id.
    pub source_id: Option<String>,
    /// 0 means unknown.
    pub duration_secs: u64,
    pub thumbnail: Option<String>,
    pub requested_by: Requester,
    pub is_video: bool,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        media_ref: impl Into<String>,
        duration_secs: u64,
        requested_by: Requester,
    ) -> Self {
        Self {
            title: title.into(),
            media_ref: media_ref.into(),
            source_id: None,
            duration_secs,
            thumbnail: None,
            requested_by,
            is_video: false,
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn video(mut self) -> Self {
        self.is_video = true;
        self
    }

    /// Length used for scheduling; unknown durations fall back to `default_secs`.
    pub fn effective_secs(&self, default_secs: u64) -> u64 {
        if self.duration_secs == 0 {
            default_secs
        } else {
            self.duration_secs
        }
    }

    pub fn scheduled_duration(&self, default_secs: u64) -> Duration {
        Duration::from_secs(self.effective_secs(default_secs))
    }
}

/// A queued track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub track: Track,
    /// Unix timestamp in milliseconds.
    pub enqueued_at: u64,
}

impl QueueEntry {
    pub fn new(track: Track) -> Self {
        Self {
            track,
            enqueued_at: now_ms(),
        }
    }

    pub fn into_track(self) -> Track {
        self.track
    }
}

impl std::ops::Deref for QueueEntry {
    type Target = Track;

    fn deref(&self) -> &Self::Target {
        &self.track
    }
}
