use serde::{Deserialize, Serialize};

/// Duration ceilings applied before a track is allowed into a queue.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LimitsConfig {
    #[serde(default = "default_max_audio_secs")]
    pub max_audio_secs: u64,
    #[serde(default = "default_max_video_secs")]
    pub max_video_secs: u64,
}

impl LimitsConfig {
    pub fn ceiling_for(&self, is_video: bool) -> u64 {
        if is_video {
            self.max_video_secs
        } else {
            self.max_audio_secs
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_audio_secs: default_max_audio_secs(),
            max_video_secs: default_max_video_secs(),
        }
    }
}

fn default_max_audio_secs() -> u64 {
    7200
}

fn default_max_video_secs() -> u64 {
    3600
}
