//! The follower-count fallback chain.
//!
//! Order is fixed: cache, aggregator API, profile scrape. A primary-source
//! failure is never surfaced to the caller — it is logged and the chain
//! moves on. Only the fallback can produce a caller-visible error, and it
//! distinguishes "page fetched but nothing matched" from "could not fetch
//! the page at all" so the HTTP surface can answer 404 vs 500.

use std::time::Duration;

use tally_common::Creator;
use thiserror::Error;

use crate::cache::FollowerCache;
use crate::tiktok::extract::ExtractorChain;
use crate::tiktok::{AggregatorClient, ProfileScraper};

#[derive(Debug, Error)]
pub enum LookupError {
    /// The fallback page was fetched but no extraction rule matched —
    /// usually a captcha or an interstitial instead of the profile.
    #[error("no follower count found for {creator}; the platform may have served a captcha")]
    NotFound { creator: Creator },
    /// The fallback fetch itself failed; nothing left to try.
    #[error("follower sources unavailable for {creator}: {reason}")]
    Unavailable { creator: Creator, reason: String },
}

/// A lookup result plus where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub followers: u64,
    pub cached: bool,
}

pub struct FollowerLookup {
    aggregator: AggregatorClient,
    scraper: ProfileScraper,
    extractors: ExtractorChain,
    cache: FollowerCache,
}

impl FollowerLookup {
    pub fn new(aggregator: AggregatorClient, scraper: ProfileScraper, cache_ttl: Duration) -> Self {
        Self {
            aggregator,
            scraper,
            extractors: ExtractorChain::standard(),
            cache: FollowerCache::new(cache_ttl),
        }
    }

    /// Swap in a different rule set (tests, page-format experiments).
    pub fn with_extractors(mut self, extractors: ExtractorChain) -> Self {
        self.extractors = extractors;
        self
    }

    /// Resolve the current follower count for `creator`.
    ///
    /// The check-then-fetch-then-store sequence is not atomic: two
    /// concurrent lookups for a cold creator may both go upstream. Accepted
    /// — the cache throttles bursts, it does not guarantee single-flight.
    pub async fn followers(&self, creator: &Creator) -> Result<Snapshot, LookupError> {
        if let Some(count) = self.cache.fresh(creator) {
            tracing::debug!(%creator, count, "cache hit");
            return Ok(Snapshot {
                followers: count,
                cached: true,
            });
        }

        match self.aggregator.follower_count(creator).await {
            Ok(count) => {
                self.cache.store(creator, count);
                return Ok(Snapshot {
                    followers: count,
                    cached: false,
                });
            }
            Err(err) => {
                tracing::info!(%creator, error = %err, "aggregator failed; scraping profile page");
            }
        }

        let body = self.scraper.fetch(creator).await.map_err(|err| {
            let kind = if err.is_transport() { "transport" } else { "upstream" };
            tracing::warn!(%creator, error = %err, kind, "profile scrape failed");
            LookupError::Unavailable {
                creator: creator.clone(),
                reason: err.to_string(),
            }
        })?;

        match self.extractors.attempt(&body) {
            Some(count) => {
                self.cache.store(creator, count);
                Ok(Snapshot {
                    followers: count,
                    cached: false,
                })
            }
            None => {
                tracing::warn!(%creator, body_len = body.len(), "no extraction rule matched");
                Err(LookupError::NotFound {
                    creator: creator.clone(),
                })
            }
        }
    }
}
