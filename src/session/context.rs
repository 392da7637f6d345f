use std::{collections::VecDeque, time::Duration};

use tokio::time::Instant;

use crate::{
    common::types::{ChatId, Epoch},
    protocol::{
        models::{NowPlaying, PlaybackState, SessionSnapshot},
        tracks::{QueueEntry, Track},
    },
    scheduler::timer::TimerHandle,
};

/// Mutable playback state of one chat. Only touched while the chat's lock is
/// held.
pub struct ChatSession {
    pub chat_id: ChatId,
    /// Track believed to be streaming right now.
    pub current: Option<Track>,
    pub queue: VecDeque<QueueEntry>,
    pub started_at: Option<Instant>,
    /// When the transport last began a stream for `current`. Unlike
    /// `started_at` this is not shifted by seeks or held pauses.
    pub stream_started_at: Option<Instant>,
    pub loop_remaining: u32,
    pub epoch: Epoch,
    /// Joined to the voice call.
    pub active: bool,
    /// The transport holds a stream for this chat, so the next track can be
    /// switched in place.
    pub streaming: bool,
    pub paused: bool,
    /// Set while a pause is holding the auto-advance countdown.
    pub held_since: Option<Instant>,
    pub timer: Option<TimerHandle>,
}

impl ChatSession {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            current: None,
            queue: VecDeque::new(),
            started_at: None,
            stream_started_at: None,
            loop_remaining: 0,
            epoch: Epoch::default(),
            active: false,
            streaming: false,
            paused: false,
            held_since: None,
            timer: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        if self.current.is_some() && self.active {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }

    /// Cancels the pending timer and moves to a fresh epoch.
    pub fn bump_epoch(&mut self) -> Epoch {
        self.cancel_timer();
        self.epoch = self.epoch.next();
        self.epoch
    }

    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Time spent on `current`, excluding any pause that is holding the timer.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let Some(started_at) = self.started_at else {
            return Duration::ZERO;
        };
        self.held_since
            .unwrap_or(now)
            .saturating_duration_since(started_at)
    }

    /// How long the live stream has been up.
    pub fn stream_uptime(&self, now: Instant) -> Duration {
        self.stream_started_at
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default()
    }

    /// Time left before `current` is expected to end.
    pub fn remaining(&self, now: Instant, default_secs: u64) -> Duration {
        let Some(track) = &self.current else {
            return Duration::ZERO;
        };
        track
            .scheduled_duration(default_secs)
            .saturating_sub(self.elapsed(now))
    }

    /// Back to idle: no current track, empty queue, fresh epoch.
    pub fn reset_idle(&mut self) {
        self.bump_epoch();
        self.current = None;
        self.queue.clear();
        self.started_at = None;
        self.stream_started_at = None;
        self.loop_remaining = 0;
        self.paused = false;
        self.held_since = None;
    }

    /// Appends to the queue and returns the 1-based position.
    pub fn push_back(&mut self, track: Track) -> usize {
        self.queue.push_back(QueueEntry::new(track));
        self.queue.len()
    }

    pub fn push_front(&mut self, track: Track) {
        self.queue.push_front(QueueEntry::new(track));
    }

    pub fn snapshot(&self, now: Instant, default_secs: u64) -> SessionSnapshot {
        SessionSnapshot {
            chat_id: self.chat_id,
            state: self.state(),
            active: self.active,
            now_playing: self.current.as_ref().map(|track| NowPlaying {
                track: track.clone(),
                elapsed_secs: self.elapsed(now).as_secs(),
                total_secs: track.effective_secs(default_secs),
                paused: self.paused,
            }),
            queue: self.queue.iter().cloned().collect(),
            loop_remaining: self.loop_remaining,
            epoch: self.epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::tracks::Requester;

    fn track(title: &str, secs: u64) -> Track {
        Track::new(title, format!("media://{title}"), secs, Requester::new(1u64, "tester"))
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = ChatSession::new(ChatId(5));
        assert_eq!(session.state(), PlaybackState::Idle);
        assert_eq!(session.epoch, Epoch(0));
        assert!(session.queue.is_empty());
    }

    #[test]
    fn test_playing_requires_active_and_current() {
        let mut session = ChatSession::new(ChatId(5));
        session.current = Some(track("a", 10));
        assert_eq!(session.state(), PlaybackState::Idle);
        session.active = true;
        assert_eq!(session.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_queue_positions_are_one_based_fifo() {
        let mut session = ChatSession::new(ChatId(5));
        assert_eq!(session.push_back(track("a", 10)), 1);
        assert_eq!(session.push_back(track("b", 10)), 2);
        session.push_front(track("x", 10));
        let titles: Vec<_> = session.queue.iter().map(|e| e.title.clone()).collect();
        assert_eq!(titles, ["x", "a", "b"]);
    }

    #[test]
    fn test_reset_idle_bumps_epoch_and_clears() {
        let mut session = ChatSession::new(ChatId(5));
        session.current = Some(track("a", 10));
        session.push_back(track("b", 10));
        session.loop_remaining = 2;

        session.reset_idle();
        assert!(session.current.is_none());
        assert!(session.queue.is_empty());
        assert_eq!(session.loop_remaining, 0);
        assert_eq!(session.epoch, Epoch(1));

        session.reset_idle();
        assert_eq!(session.epoch, Epoch(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_freezes_while_held() {
        let mut session = ChatSession::new(ChatId(5));
        session.current = Some(track("a", 100));
        session.started_at = Some(Instant::now());

        tokio::time::advance(Duration::from_secs(30)).await;
        session.held_since = Some(Instant::now());
        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(session.elapsed(Instant::now()), Duration::from_secs(30));
        assert_eq!(
            session.remaining(Instant::now(), 180),
            Duration::from_secs(70)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_uptime_ignores_seek_offset() {
        let mut session = ChatSession::new(ChatId(5));
        assert_eq!(session.stream_uptime(Instant::now()), Duration::ZERO);

        let now = Instant::now();
        session.current = Some(track("a", 100));
        session.stream_started_at = Some(now);
        session.started_at = now.checked_sub(Duration::from_secs(40));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(session.stream_uptime(Instant::now()), Duration::from_secs(1));
        assert_eq!(session.elapsed(Instant::now()), Duration::from_secs(41));
    }
}
