use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::{SchedulerInner, timer};
use crate::{
    common::{Severity, errors::TransportError},
    protocol::{events::SchedulerEvent, tracks::Track},
    session::ChatSession,
    transport::StreamRequest,
};

impl SchedulerInner {
    pub(crate) async fn notify(&self, event: SchedulerEvent) {
        self.sink.notify(event).await;
    }

    /// Streams `track` from `offset_secs` under a fresh epoch and arms its
    /// timer. On failure `current` is left untouched and no timer is pending.
    pub(crate) async fn begin(
        &self,
        session: &mut ChatSession,
        track: &Track,
        offset_secs: u64,
    ) -> Result<(), TransportError> {
        let chat_id = session.chat_id;
        let epoch = session.bump_epoch();
        let request = StreamRequest {
            chat_id,
            media_ref: track.media_ref.clone(),
            video: track.is_video,
            epoch,
            offset_secs,
        };

        if session.streaming {
            match self.controller.switch(&request).await {
                Ok(()) => {}
                Err(TransportError::Unsupported) => {
                    self.controller.stop(chat_id).await?;
                    session.streaming = false;
                    self.controller.start(&request).await?;
                }
                Err(e) => return Err(e),
            }
        } else {
            self.controller.start(&request).await?;
        }
        session.streaming = true;

        let offset = Duration::from_secs(offset_secs);
        let now = Instant::now();
        session.current = Some(track.clone());
        session.started_at = Some(now.checked_sub(offset).unwrap_or(now));
        session.stream_started_at = Some(now);
        session.paused = false;
        session.held_since = None;

        let remaining = track
            .scheduled_duration(self.config.default_track_secs)
            .saturating_sub(offset);
        session.timer = Some(timer::arm(self.this.clone(), chat_id, epoch, remaining));
        Ok(())
    }

    /// Re-arms the auto-advance for whatever is left of `current` in the
    /// session's present epoch.
    pub(crate) fn rearm(&self, session: &mut ChatSession) {
        if session.current.is_none() {
            return;
        }
        session.cancel_timer();
        let remaining = session.remaining(Instant::now(), self.config.default_track_secs);
        session.timer = Some(timer::arm(
            self.this.clone(),
            session.chat_id,
            session.epoch,
            remaining,
        ));
    }

    /// Moves to the next track, or to idle when nothing is left. Must be
    /// called with the chat's lock held.
    pub(crate) async fn advance(&self, session: &mut ChatSession) {
        let chat_id = session.chat_id;

        if session.loop_remaining > 0 {
            if let Some(current) = session.current.clone() {
                session.loop_remaining -= 1;
                debug!(
                    "[{}] Looping {} ({} repeat(s) left)",
                    chat_id, current.title, session.loop_remaining
                );
                session.push_front(current);
            }
        }

        let mut failures = 0u32;
        while let Some(entry) = session.queue.pop_front() {
            let track = entry.into_track();
            match self.begin(session, &track, 0).await {
                Ok(()) => {
                    info!(
                        "[{}] Now playing: {} ({})",
                        chat_id, track.title, session.epoch
                    );
                    self.notify(SchedulerEvent::NowPlaying {
                        chat_id,
                        requested_by: track.requested_by.clone(),
                        track,
                    })
                    .await;
                    return;
                }
                Err(e) => {
                    failures += 1;
                    session.current = None;
                    let halted = failures >= self.config.max_failed_advances;
                    warn!("[{}] Could not play {}: {}", chat_id, track.title, e);
                    self.notify(SchedulerEvent::TrackFailed {
                        chat_id,
                        track,
                        reason: e.to_string(),
                        severity: if halted {
                            Severity::Fault
                        } else {
                            Severity::Common
                        },
                    })
                    .await;

                    if halted {
                        error!(
                            "[{}] Transport failed {} times in a row, forcing idle and dropping {} queued track(s)",
                            chat_id,
                            failures,
                            session.queue.len()
                        );
                        break;
                    }
                }
            }
        }

        self.finish(session).await;
    }

    /// Queue exhausted: leave the call and tell the chat.
    pub(crate) async fn finish(&self, session: &mut ChatSession) {
        let chat_id = session.chat_id;
        self.teardown(session, true).await;
        info!("[{}] Queue finished", chat_id);
        self.notify(SchedulerEvent::QueueFinished { chat_id }).await;
    }

    /// Resets the session to idle and marks it disconnected. Transport errors
    /// while leaving are logged and otherwise ignored.
    pub(crate) async fn teardown(&self, session: &mut ChatSession, leave_call: bool) {
        let chat_id = session.chat_id;
        session.reset_idle();

        if leave_call && (session.active || session.streaming) {
            if let Err(e) = self.controller.leave(chat_id).await {
                warn!("[{}] Failed to leave call: {}", chat_id, e);
            }
        }

        session.active = false;
        session.streaming = false;
    }
}
