//! Event model and the connection seam.
use async_trait::async_trait;
use tally_common::{Creator, FollowNotice};
use thiserror::Error;
use tokio::sync::mpsc;

/// Everything a live session can report to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Someone followed the creator mid-broadcast.
    Follow(FollowNotice),
    /// The broadcast ended normally.
    StreamEnd,
    /// The underlying connection dropped without a stream-end signal.
    Disconnected,
}

#[derive(Debug, Error)]
pub enum LiveError {
    /// No gateway configured; live relaying is effectively off.
    #[error("no live gateway configured")]
    NotConfigured,
    #[error("invalid gateway URL: {0}")]
    Gateway(String),
    /// Stream offline, creator unknown, or the gateway refused us.
    #[error("live connect failed for {creator}: {reason}")]
    Connect { creator: Creator, reason: String },
    #[error("live connect timed out for {creator}")]
    Timeout { creator: Creator },
}

/// An open live session: the creator it belongs to plus a bounded stream
/// of events. When the driver's pump task ends, the channel closes and
/// [`LiveSession::next_event`] starts returning `None`.
#[derive(Debug)]
pub struct LiveSession {
    creator: Creator,
    events: mpsc::Receiver<LiveEvent>,
}

impl LiveSession {
    pub fn new(creator: Creator, events: mpsc::Receiver<LiveEvent>) -> Self {
        Self { creator, events }
    }

    pub fn creator(&self) -> &Creator {
        &self.creator
    }

    pub async fn next_event(&mut self) -> Option<LiveEvent> {
        self.events.recv().await
    }
}

/// Seam between the relay and whatever implements the live protocol.
#[async_trait]
pub trait LiveSource: Send + Sync {
    async fn connect(&self, creator: &Creator) -> Result<LiveSession, LiveError>;
}

/// Source used when no gateway is configured: every subscribe attempt
/// fails the same way a connect failure would, and gets logged upstream.
pub struct DisabledSource;

#[async_trait]
impl LiveSource for DisabledSource {
    async fn connect(&self, _creator: &Creator) -> Result<LiveSession, LiveError> {
        Err(LiveError::NotConfigured)
    }
}
