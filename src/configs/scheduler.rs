use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Scheduling length for tracks whose duration is zero or unknown.
    #[serde(default = "default_track_secs")]
    pub default_track_secs: u64,
    /// Consecutive transport failures tolerated during one advance before the
    /// chat is forced idle.
    #[serde(default = "default_max_failed_advances")]
    pub max_failed_advances: u32,
    /// Untagged stream-ended events arriving sooner than this after a stream
    /// started are treated as duplicates.
    #[serde(default = "default_stream_end_debounce_ms")]
    pub stream_end_debounce_ms: u64,
    /// Stop the auto-advance countdown while paused.
    #[serde(default)]
    pub pause_holds_timer: bool,
}

impl SchedulerConfig {
    pub fn stream_end_debounce(&self) -> Duration {
        Duration::from_millis(self.stream_end_debounce_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_track_secs: default_track_secs(),
            max_failed_advances: default_max_failed_advances(),
            stream_end_debounce_ms: default_stream_end_debounce_ms(),
            pause_holds_timer: false,
        }
    }
}

fn default_track_secs() -> u64 {
    180
}

fn default_max_failed_advances() -> u32 {
    3
}

fn default_stream_end_debounce_ms() -> u64 {
    1500
}
