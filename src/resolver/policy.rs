use crate::{common::errors::ResolveError, configs::LimitsConfig, protocol::tracks::Track};

/// Rejects tracks longer than the configured ceiling for their kind.
#[derive(Debug, Clone, Default)]
pub struct DurationPolicy {
    limits: LimitsConfig,
}

impl DurationPolicy {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    pub fn check(&self, track: &Track) -> Result<(), ResolveError> {
        let limit_secs = self.limits.ceiling_for(track.is_video);
        if track.duration_secs > limit_secs {
            return Err(ResolveError::TooLong {
                duration_secs: track.duration_secs,
                limit_secs,
            });
        }
        Ok(())
    }
}
