use std::{sync::Weak, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{Scheduler, SchedulerInner};
use crate::common::types::{ChatId, Epoch};

/// Pending auto-advance for one chat. The spawned task carries the epoch it
/// was armed in.
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    /// Best effort: a timer already past its sleep still runs, and is then
    /// stopped by the epoch check in `on_timer_fired`.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Spawns the fallback that advances `chat_id` once `after` has elapsed.
pub(crate) fn arm(
    scheduler: Weak<SchedulerInner>,
    chat_id: ChatId,
    epoch: Epoch,
    after: Duration,
) -> TimerHandle {
    let token = CancellationToken::new();
    let cancelled = token.clone();

    trace!("[{}] arming auto-advance in {:?} ({})", chat_id, after, epoch);

    tokio::spawn(async move {
        tokio::select! {
            _ = cancelled.cancelled() => {
                trace!("[{}] auto-advance cancelled ({})", chat_id, epoch);
            }
            _ = tokio::time::sleep(after) => {
                let Some(inner) = scheduler.upgrade() else {
                    return;
                };
                debug!("[{}] auto-advance timer fired ({})", chat_id, epoch);
                Scheduler::from_inner(inner).on_timer_fired(chat_id, epoch).await;
            }
        }
    });

    TimerHandle { token }
}
