//! Follower-count acquisition for Tally.
//!
//! The [`lookup::FollowerLookup`] service answers "how many followers does
//! this creator have right now" by walking a fallback chain: a short-lived
//! cache, then the aggregator widget API, then a scrape of the public
//! profile page. Submodules under [`tiktok`] hold the platform-specific
//! clients and the extraction rules applied to raw markup.
pub mod cache;
pub mod lookup;
pub mod tiktok;

pub use lookup::{FollowerLookup, LookupError, Snapshot};
