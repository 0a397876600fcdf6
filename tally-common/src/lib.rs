//! Common types and utilities shared across Tally crates.
//!
//! This crate defines the creator handle, the follow-notice payload that
//! travels from the live driver to the overlay hub, and the centralised
//! tracing/logging initialisation. It is intentionally lightweight and
//! dependency-minimal so that all crates can depend on it without
//! introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`Creator`]: opaque platform handle used to address counts and streams
//! - [`FollowNotice`]: the name/avatar pair broadcast to overlay clients
//! - [`observability`]: centralised tracing/logging initialisation
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod observability;

/// Opaque creator handle.
///
/// The platform accepts these verbatim in profile URLs and live-stream
/// lookups, so no validation or normalisation is applied here. Whatever the
/// caller supplies is what goes upstream.
///
/// ```rust
/// use tally_common::Creator;
///
/// let c = Creator::from("alice");
/// assert_eq!(c.as_str(), "alice");
/// assert_eq!(c.to_string(), "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Creator(String);

impl Creator {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for Creator {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Creator {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Creator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single "new follower" notification as delivered to overlay clients.
///
/// Field names mirror what the live gateway reports; the server wraps this
/// into its wire envelope before it reaches a browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowNotice {
    pub nickname: String,
    pub avatar: String,
}
