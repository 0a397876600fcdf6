//! Short-lived follower-count cache.
//!
//! The cache exists to keep request bursts from hammering the upstream
//! sources (and getting the host IP banned), not to serve as storage:
//! entries are overwritten in place and never proactively purged. Staleness
//! is decided at read time against a flat TTL.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tally_common::Creator;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    followers: u64,
    fetched_at: Instant,
}

pub struct FollowerCache {
    entries: DashMap<Creator, CacheEntry>,
    ttl: Duration,
}

impl FollowerCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Last known count for `creator`, if it was fetched within the TTL.
    /// Stale entries are left in place — the next successful fetch
    /// overwrites them.
    pub fn fresh(&self, creator: &Creator) -> Option<u64> {
        let entry = self.entries.get(creator)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.followers)
        } else {
            None
        }
    }

    /// Record a successful fetch. Last writer wins.
    pub fn store(&self, creator: &Creator, followers: u64) {
        self.entries.insert(
            creator.clone(),
            CacheEntry {
                followers,
                fetched_at: Instant::now(),
            },
        );
    }
}
