use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::ChatId;

/// Failure severity attached to `TrackFailed` notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    /// A single track could not be played; playback moved on.
    Common,
    /// Repeated failures; the chat was forced back to idle.
    Fault,
}

/// Errors raised by a `StreamController`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The transport has no in-place switch; callers fall back to stop + start.
    #[error("operation not supported by transport")]
    Unsupported,

    #[error("not in a voice call for chat {0}")]
    NotInCall(ChatId),

    #[error("transport failure: {0}")]
    Failed(String),
}

/// Errors raised by a `TrackResolver`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no match for \"{0}\"")]
    NotFound(String),

    #[error("track is {duration_secs}s long, limit is {limit_secs}s")]
    TooLong { duration_secs: u64, limit_secs: u64 },

    #[error("resolver failure: {0}")]
    Failed(String),
}

/// Errors surfaced synchronously to the caller of a scheduler command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("chat {0} is not connected to a voice call")]
    NotConnected(ChatId),

    #[error("nothing is playing in chat {0}")]
    NothingPlaying(ChatId),

    #[error("track is {duration_secs}s long, limit is {limit_secs}s")]
    TooLong { duration_secs: u64, limit_secs: u64 },

    #[error("no match for \"{0}\"")]
    NotFound(String),

    #[error("resolver failure: {0}")]
    Resolver(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<ResolveError> for SchedulerError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NotFound(q) => Self::NotFound(q),
            ResolveError::TooLong {
                duration_secs,
                limit_secs,
            } => Self::TooLong {
                duration_secs,
                limit_secs,
            },
            ResolveError::Failed(msg) => Self::Resolver(msg),
        }
    }
}

pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_errors_map_to_scheduler_errors() {
        let e: SchedulerError = ResolveError::NotFound("lofi".into()).into();
        assert_eq!(e, SchedulerError::NotFound("lofi".into()));

        let e: SchedulerError = ResolveError::TooLong {
            duration_secs: 9000,
            limit_secs: 7200,
        }
        .into();
        assert!(matches!(e, SchedulerError::TooLong { limit_secs: 7200, .. }));
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let e: SchedulerError = TransportError::Failed("socket closed".into()).into();
        assert_eq!(e.to_string(), "transport failure: socket closed");
    }
}
