//! Fallback fetch of the public profile page.
//!
//! The page is served to anything that looks like a desktop browser, so the
//! request carries a full set of impersonating headers. What comes back is
//! raw markup with embedded hydration JSON; extraction happens separately
//! (see [`super::extract`]).
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT};
use std::time::Duration;
use tally_common::Creator;
use tally_http::{HttpClient, HttpError, RequestOpts};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
const DOCUMENT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

#[derive(Clone)]
pub struct ProfileScraper {
    http: HttpClient,
    headers: HeaderMap,
}

impl ProfileScraper {
    pub fn new(endpoint: &str, timeout: Duration, accept_language: &str) -> Result<Self> {
        let http = HttpClient::new(endpoint)
            .with_context(|| format!("invalid profile endpoint: {endpoint}"))?
            .with_timeout(timeout);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(DOCUMENT_ACCEPT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(accept_language)
                .with_context(|| format!("invalid accept_language: {accept_language}"))?,
        );
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        Ok(Self { http, headers })
    }

    /// Fetch the creator's profile page as raw markup.
    pub async fn fetch(&self, creator: &Creator) -> Result<String, HttpError> {
        self.http
            .get_text(
                &format!("@{creator}"),
                RequestOpts {
                    headers: Some(self.headers.clone()),
                    ..Default::default()
                },
            )
            .await
    }
}
