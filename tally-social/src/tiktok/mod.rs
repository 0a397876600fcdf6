//! TikTok-facing acquisition surface.
//!
//! Submodules provide the aggregator API client, the profile-page scraper,
//! and the extraction rules run over raw markup. Neither upstream is
//! documented, so expect the scrape rules in particular to need updating
//! when the page format changes.
pub mod counter;
pub mod extract;
pub mod profile;

pub use counter::AggregatorClient;
pub use profile::ProfileScraper;
