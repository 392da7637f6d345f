//! Per-chat playback scheduling.
//!
//! Every operation takes the chat's lock for its whole critical section,
//! transport calls included. Deferred work (the auto-advance timer and
//! transport end events) carries the epoch it was issued under and is dropped
//! when the session has moved on.

use std::sync::{Arc, Weak};

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    common::{
        errors::{SchedulerError, SchedulerResult},
        types::{ChatId, Epoch},
    },
    configs::{LimitsConfig, SchedulerConfig},
    protocol::{
        events::SchedulerEvent,
        models::{EnqueueOutcome, PlaybackState, SessionSnapshot},
        tracks::{Requester, Track},
    },
    resolver::{DurationPolicy, TrackResolver},
    session::{
        ChatGuard, ChatSession, MemorySessionStore, SessionStore, lock_chat, lock_existing,
    },
    transport::StreamController,
};

mod advance;
pub mod notify;
pub mod timer;


pub use notify::{ChannelSink, NotificationSink};

pub(crate) struct SchedulerInner {
    store: Arc<dyn SessionStore>,
    controller: Arc<dyn StreamController>,
    sink: Arc<dyn NotificationSink>,
    resolver: Option<Arc<dyn TrackResolver>>,
    policy: DurationPolicy,
    config: SchedulerConfig,
    this: Weak<SchedulerInner>,
}

/// Cheap to clone; all clones drive the same sessions.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

pub struct SchedulerBuilder {
    controller: Arc<dyn StreamController>,
    sink: Arc<dyn NotificationSink>,
    store: Option<Arc<dyn SessionStore>>,
    resolver: Option<Arc<dyn TrackResolver>>,
    config: SchedulerConfig,
    limits: LimitsConfig,
}

impl SchedulerBuilder {
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn TrackResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn build(self) -> Scheduler {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new()));
        let inner = Arc::new_cyclic(|this| SchedulerInner {
            store,
            controller: self.controller,
            sink: self.sink,
            resolver: self.resolver,
            policy: DurationPolicy::new(self.limits),
            config: self.config,
            this: this.clone(),
        });
        Scheduler { inner }
    }
}

impl Scheduler {
    pub fn builder(
        controller: Arc<dyn StreamController>,
        sink: Arc<dyn NotificationSink>,
    ) -> SchedulerBuilder {
        SchedulerBuilder {
            controller,
            sink,
            store: None,
            resolver: None,
            config: SchedulerConfig::default(),
            limits: LimitsConfig::default(),
        }
    }

    pub(crate) fn from_inner(inner: Arc<SchedulerInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    fn check_limits(&self, track: &Track) -> SchedulerResult<()> {
        Ok(self.inner.policy.check(track)?)
    }

    /// Joins the chat's voice call. A no-op when already joined.
    pub async fn connect(&self, chat_id: ChatId) -> SchedulerResult<()> {
        let mut session = lock_chat(self.inner.store.as_ref(), chat_id).await;
        if session.active {
            return Ok(());
        }
        self.inner.controller.join(chat_id).await?;
        session.active = true;
        info!("[{}] Joined voice call", chat_id);
        Ok(())
    }

    /// Appends to the queue, or starts right away when the chat is idle.
    pub async fn enqueue(&self, chat_id: ChatId, track: Track) -> SchedulerResult<EnqueueOutcome> {
        self.check_limits(&track)?;
        let mut session = lock_chat(self.inner.store.as_ref(), chat_id).await;

        if session.state() == PlaybackState::Playing {
            let position = session.push_back(track.clone());
            info!("[{}] Queued {} at #{}", chat_id, track.title, position);
            self.inner
                .notify(SchedulerEvent::QueuedAt {
                    chat_id,
                    track,
                    position,
                })
                .await;
            return Ok(EnqueueOutcome::Queued { position });
        }

        self.play_locked(&mut session, track).await?;
        Ok(EnqueueOutcome::Started)
    }

    /// Starts `track` immediately, replacing whatever was playing.
    pub async fn play_now(&self, chat_id: ChatId, track: Track) -> SchedulerResult<()> {
        self.check_limits(&track)?;
        let mut session = lock_chat(self.inner.store.as_ref(), chat_id).await;
        self.play_locked(&mut session, track).await
    }

    /// Starts `track` immediately; the interrupted track goes back to the
    /// front of the queue so it resumes next.
    pub async fn force_play(&self, chat_id: ChatId, track: Track) -> SchedulerResult<()> {
        self.check_limits(&track)?;
        let mut session = lock_chat(self.inner.store.as_ref(), chat_id).await;
        if !session.active {
            return Err(SchedulerError::NotConnected(chat_id));
        }

        if let Some(previous) = session.current.take() {
            debug!("[{}] {} pushed back by force play", chat_id, previous.title);
            session.push_front(previous);
        }
        self.play_locked(&mut session, track).await
    }

    async fn play_locked(&self, session: &mut ChatSession, track: Track) -> SchedulerResult<()> {
        let chat_id = session.chat_id;
        if !session.active {
            return Err(SchedulerError::NotConnected(chat_id));
        }

        if let Some(previous) = &session.current {
            debug!("[{}] Replacing {}", chat_id, previous.title);
        }

        match self.inner.begin(session, &track, 0).await {
            Ok(()) => {
                info!(
                    "[{}] Now playing: {} ({})",
                    chat_id, track.title, session.epoch
                );
                self.inner
                    .notify(SchedulerEvent::NowPlaying {
                        chat_id,
                        requested_by: track.requested_by.clone(),
                        track,
                    })
                    .await;
                Ok(())
            }
            Err(e) => {
                warn!("[{}] Failed to start {}: {}", chat_id, track.title, e);
                session.current = None;
                if !session.queue.is_empty() {
                    self.inner.advance(session).await;
                } else if session.streaming {
                    // The previous track may still be live with no timer behind it.
                    self.inner.finish(session).await;
                }
                Err(e.into())
            }
        }
    }

    /// Stops the current track and moves on.
    pub async fn skip(&self, chat_id: ChatId) -> SchedulerResult<()> {
        let Some(mut session) = lock_existing(self.inner.store.as_ref(), chat_id).await else {
            return Err(SchedulerError::NotConnected(chat_id));
        };
        if !session.active {
            return Err(SchedulerError::NotConnected(chat_id));
        }
        if session.current.is_none() {
            return Err(SchedulerError::NothingPlaying(chat_id));
        }

        session.bump_epoch();
        if let Err(e) = self.inner.controller.stop(chat_id).await {
            warn!("[{}] Skip failed to stop stream: {}", chat_id, e);
            self.inner.rearm(&mut session);
            return Err(e.into());
        }
        session.streaming = false;

        info!("[{}] Skipped", chat_id);
        self.inner.advance(&mut session).await;
        Ok(())
    }

    /// Transport reported end of media. Returns whether the chat advanced.
    ///
    /// Tagged events must match the current epoch. Untagged ones are accepted
    /// only once the stream has been up for the debounce window, which keeps a
    /// duplicate delivery from skipping the track that replaced it.
    pub async fn on_stream_ended(&self, chat_id: ChatId, stream_epoch: Option<Epoch>) -> bool {
        let Some(mut session) = lock_existing(self.inner.store.as_ref(), chat_id).await else {
            return false;
        };
        if session.state() != PlaybackState::Playing {
            debug!("[{}] Stream end ignored, chat is idle", chat_id);
            return false;
        }

        match stream_epoch {
            Some(epoch) if epoch != session.epoch => {
                debug!(
                    "[{}] Stale stream end {} (now {})",
                    chat_id, epoch, session.epoch
                );
                return false;
            }
            Some(_) => {}
            None => {
                let up_for = session.stream_uptime(Instant::now());
                if up_for < self.inner.config.stream_end_debounce() {
                    debug!(
                        "[{}] Stream end {:?} after start, treating as duplicate",
                        chat_id, up_for
                    );
                    return false;
                }
            }
        }

        session.cancel_timer();
        self.inner.advance(&mut session).await;
        true
    }

    /// Auto-advance fallback. Returns whether the chat advanced.
    pub async fn on_timer_fired(&self, chat_id: ChatId, epoch: Epoch) -> bool {
        let Some(mut session) = lock_existing(self.inner.store.as_ref(), chat_id).await else {
            return false;
        };
        if epoch != session.epoch {
            debug!(
                "[{}] Stale timer {} (now {})",
                chat_id, epoch, session.epoch
            );
            return false;
        }
        if session.state() != PlaybackState::Playing || session.held_since.is_some() {
            return false;
        }

        session.timer = None;
        self.inner.advance(&mut session).await;
        true
    }

    /// Stops everything and leaves the call. Safe on unknown or idle chats.
    pub async fn end(&self, chat_id: ChatId) {
        let Some(mut session) = lock_existing(self.inner.store.as_ref(), chat_id).await else {
            return;
        };
        self.inner.teardown(&mut session, true).await;
        info!("[{}] Ended", chat_id);
    }

    /// Administrative reset; same as [`Scheduler::end`] but logged as such.
    pub async fn reset(&self, chat_id: ChatId) {
        let Some(mut session) = lock_existing(self.inner.store.as_ref(), chat_id).await else {
            return;
        };
        self.inner.teardown(&mut session, true).await;
        warn!("[{}] Session reset", chat_id);
    }

    /// The call went away without us asking.
    pub async fn on_left(&self, chat_id: ChatId) {
        let Some(mut session) = lock_existing(self.inner.store.as_ref(), chat_id).await else {
            return;
        };
        let was_busy = session.current.is_some() || !session.queue.is_empty();
        self.inner.teardown(&mut session, false).await;
        info!("[{}] Call left by transport", chat_id);
        if was_busy {
            self.inner
                .notify(SchedulerEvent::QueueFinished { chat_id })
                .await;
        }
    }

    /// Ends every chat this scheduler knows about.
    pub async fn end_all(&self) {
        let chats = self.inner.store.chats();
        join_all(chats.into_iter().map(|chat_id| self.end(chat_id))).await;
    }

    pub async fn pause(&self, chat_id: ChatId) -> SchedulerResult<()> {
        let mut session = self.lock_playing(chat_id).await?;
        self.inner.controller.pause(chat_id).await?;
        session.paused = true;

        if self.inner.config.pause_holds_timer && session.held_since.is_none() {
            session.cancel_timer();
            session.held_since = Some(Instant::now());
        }
        info!("[{}] Paused", chat_id);
        Ok(())
    }

    pub async fn resume(&self, chat_id: ChatId) -> SchedulerResult<()> {
        let mut session = self.lock_playing(chat_id).await?;
        self.inner.controller.resume(chat_id).await?;
        session.paused = false;

        if let Some(held_since) = session.held_since.take() {
            let held_for = Instant::now().saturating_duration_since(held_since);
            if let Some(started_at) = session.started_at {
                session.started_at = Some(started_at + held_for);
            }
            self.inner.rearm(&mut session);
        }
        info!("[{}] Resumed", chat_id);
        Ok(())
    }

    /// Restarts the current track `delta_secs` away from its estimated
    /// position, clamped to the track bounds. Returns the new position.
    pub async fn seek(&self, chat_id: ChatId, delta_secs: i64) -> SchedulerResult<u64> {
        let mut session = self.lock_playing(chat_id).await?;
        let Some(track) = session.current.clone() else {
            return Err(SchedulerError::NothingPlaying(chat_id));
        };

        let total = track.effective_secs(self.inner.config.default_track_secs) as i64;
        let elapsed = session.elapsed(Instant::now()).as_secs() as i64;
        let position = elapsed.saturating_add(delta_secs).clamp(0, total) as u64;

        if let Err(e) = self.inner.begin(&mut session, &track, position).await {
            warn!("[{}] Seek failed: {}", chat_id, e);
            if session.streaming {
                self.inner.rearm(&mut session);
            } else {
                session.current = None;
                self.inner.advance(&mut session).await;
            }
            return Err(e.into());
        }

        info!("[{}] Seeked {} to {}s", chat_id, track.title, position);
        Ok(position)
    }

    /// Replays the current track `count` more times.
    pub async fn set_loop(&self, chat_id: ChatId, count: u32) -> SchedulerResult<()> {
        let mut session = lock_chat(self.inner.store.as_ref(), chat_id).await;
        if session.current.is_none() {
            return Err(SchedulerError::NothingPlaying(chat_id));
        }
        session.loop_remaining = count;
        info!("[{}] Loop set to {}", chat_id, count);
        Ok(())
    }

    /// Drops every queued track and returns how many there were.
    pub async fn clear_queue(&self, chat_id: ChatId) -> usize {
        let Some(mut session) = lock_existing(self.inner.store.as_ref(), chat_id).await else {
            return 0;
        };
        let cleared = session.queue.len();
        session.queue.clear();
        info!("[{}] Cleared {} queued track(s)", chat_id, cleared);
        cleared
    }

    pub async fn snapshot(&self, chat_id: ChatId) -> Option<SessionSnapshot> {
        let session = lock_existing(self.inner.store.as_ref(), chat_id).await?;
        Some(session.snapshot(Instant::now(), self.inner.config.default_track_secs))
    }

    /// Resolves `query` and enqueues the result.
    pub async fn play_query(
        &self,
        chat_id: ChatId,
        query: &str,
        requested_by: Requester,
        video: bool,
    ) -> SchedulerResult<EnqueueOutcome> {
        let Some(resolver) = &self.inner.resolver else {
            return Err(SchedulerError::Resolver("no resolver configured".into()));
        };
        let track = resolver.resolve(query, video, requested_by).await?;
        self.enqueue(chat_id, track).await
    }

    async fn lock_playing(&self, chat_id: ChatId) -> SchedulerResult<ChatGuard> {
        let Some(session) = lock_existing(self.inner.store.as_ref(), chat_id).await else {
            return Err(SchedulerError::NotConnected(chat_id));
        };
        if !session.active {
            return Err(SchedulerError::NotConnected(chat_id));
        }
        if session.current.is_none() {
            return Err(SchedulerError::NothingPlaying(chat_id));
        }
        Ok(session)
    }
}
