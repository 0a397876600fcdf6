//! Client for the follower-count widget aggregator.
//!
//! The aggregator is an open API built for overlay widgets; it exists
//! specifically to sidestep the platform's bot blocking, which makes it the
//! preferred first stop. Its schema is unversioned: `followerCount` has
//! been observed both as a JSON number and as a numeric string, so both are
//! accepted here.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;
use tally_common::Creator;
use tally_http::{HttpClient, RequestOpts};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CountField {
    Number(u64),
    Text(String),
}

impl CountField {
    fn as_u64(&self) -> Option<u64> {
        match self {
            CountField::Number(n) => Some(*n),
            CountField::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(rename = "followerCount")]
    follower_count: Option<CountField>,
}

#[derive(Clone)]
pub struct AggregatorClient {
    http: HttpClient,
}

impl AggregatorClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let http = HttpClient::new(endpoint)
            .with_context(|| format!("invalid aggregator endpoint: {endpoint}"))?
            .with_timeout(timeout);
        Ok(Self { http })
    }

    /// Fetch the current follower count for `creator`.
    ///
    /// Any failure here — transport, non-2xx, missing or unparsable field —
    /// is reported the same way; the caller falls through to the scrape.
    pub async fn follower_count(&self, creator: &Creator) -> Result<u64> {
        let info: UserInfo = self
            .http
            .get_json(
                "",
                RequestOpts {
                    query: Some(vec![
                        ("type", Cow::Borrowed("userinfo")),
                        ("username", Cow::Borrowed(creator.as_str())),
                    ]),
                    ..Default::default()
                },
            )
            .await?;

        info.follower_count
            .as_ref()
            .and_then(CountField::as_u64)
            .with_context(|| format!("aggregator returned no usable followerCount for {creator}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_field_accepts_number_and_string() {
        let n: UserInfo = serde_json::from_str(r#"{"followerCount": 4821}"#).unwrap();
        assert_eq!(n.follower_count.unwrap().as_u64(), Some(4821));

        let s: UserInfo = serde_json::from_str(r#"{"followerCount": "4821"}"#).unwrap();
        assert_eq!(s.follower_count.unwrap().as_u64(), Some(4821));
    }

    #[test]
    fn garbage_string_count_is_rejected() {
        let g: UserInfo = serde_json::from_str(r#"{"followerCount": "lots"}"#).unwrap();
        assert_eq!(g.follower_count.unwrap().as_u64(), None);
    }

    #[test]
    fn missing_field_deserializes_to_none() {
        let m: UserInfo = serde_json::from_str(r#"{"nickname": "alice"}"#).unwrap();
        assert!(m.follower_count.is_none());
    }
}
