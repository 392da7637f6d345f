use async_trait::async_trait;

use crate::{
    common::errors::ResolveError,
    protocol::tracks::{Requester, Track},
};

pub mod catalog;
pub mod policy;

pub use catalog::CatalogResolver;
pub use policy::DurationPolicy;

/// Turns a free-text query into a playable track.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(
        &self,
        query: &str,
        video: bool,
        requested_by: Requester,
    ) -> Result<Track, ResolveError>;
}
