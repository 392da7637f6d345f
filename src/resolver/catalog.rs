use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{DurationPolicy, TrackResolver};
use crate::{
    common::errors::ResolveError,
    protocol::tracks::{Requester, Track},
};

/// Resolves queries against a fixed, in-memory catalog. Matching is
/// case-insensitive on the whole query, then on a title substring.
#[derive(Default)]
pub struct CatalogResolver {
    entries: RwLock<HashMap<String, Track>>,
    policy: DurationPolicy,
}

impl CatalogResolver {
    pub fn new(policy: DurationPolicy) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            policy,
        }
    }

    pub fn insert(&self, track: Track) {
        self.entries
            .write()
            .insert(normalize(&track.title), track);
    }

    fn lookup(&self, query: &str) -> Option<Track> {
        let key = normalize(query);
        let entries = self.entries.read();
        if let Some(track) = entries.get(&key) {
            return Some(track.clone());
        }
        let mut hits: Vec<&Track> = entries
            .iter()
            .filter(|(title, _)| title.contains(&key))
            .map(|(_, t)| t)
            .collect();
        hits.sort_by(|a, b| a.title.cmp(&b.title));
        hits.first().map(|t| (*t).clone())
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[async_trait]
impl TrackResolver for CatalogResolver {
    async fn resolve(
        &self,
        query: &str,
        video: bool,
        requested_by: Requester,
    ) -> Result<Track, ResolveError> {
        if normalize(query).is_empty() {
            return Err(ResolveError::NotFound(query.to_string()));
        }
        let mut track = self
            .lookup(query)
            .ok_or_else(|| ResolveError::NotFound(query.to_string()))?;
        track.requested_by = requested_by;
        track.is_video = video;
        self.policy.check(&track)?;
        Ok(track)
    }
}
