//! Websocket client for the webcast gateway.
//!
//! The gateway emits one JSON object per text frame. Only `follow` and
//! `streamEnd` frames matter here; everything else (chat, gifts, likes) is
//! skipped. Reconnection is deliberately absent — when the socket dies the
//! session reports `Disconnected` and it is up to a fresh subscribe to
//! start over.
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tally_common::{Creator, FollowNotice};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::source::{LiveError, LiveEvent, LiveSession, LiveSource};

#[derive(Debug, Deserialize)]
struct FrameUser {
    #[serde(default)]
    nickname: String,
    #[serde(rename = "avatarUrl", default)]
    avatar_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Frame {
    Follow { user: FrameUser },
    StreamEnd,
    #[serde(other)]
    Other,
}

#[derive(Debug)]
pub struct WebcastSource {
    gateway: Url,
    connect_timeout: Duration,
    event_buffer: usize,
}

impl WebcastSource {
    pub fn new(
        gateway: &str,
        connect_timeout: Duration,
        event_buffer: usize,
    ) -> Result<Self, LiveError> {
        let gateway = Url::parse(gateway).map_err(|e| LiveError::Gateway(e.to_string()))?;
        Ok(Self {
            gateway,
            connect_timeout,
            event_buffer,
        })
    }

    fn session_url(&self, creator: &Creator) -> Url {
        let mut url = self.gateway.clone();
        url.query_pairs_mut()
            .append_pair("unique_id", creator.as_str());
        url
    }
}

#[async_trait]
impl LiveSource for WebcastSource {
    async fn connect(&self, creator: &Creator) -> Result<LiveSession, LiveError> {
        let url = self.session_url(creator);

        let (ws, _resp) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| LiveError::Timeout {
                creator: creator.clone(),
            })?
            .map_err(|e| LiveError::Connect {
                creator: creator.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(%creator, "live session connected");

        let (tx, rx) = mpsc::channel(self.event_buffer);
        let pump_creator = creator.clone();
        tokio::spawn(async move {
            pump_frames(ws, pump_creator, tx).await;
        });

        Ok(LiveSession::new(creator.clone(), rx))
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Forward gateway frames into the session channel until the socket or the
/// receiver goes away. Always tries to deliver a terminal event so the
/// relay can clean up its map.
async fn pump_frames(mut ws: WsStream, creator: Creator, tx: mpsc::Sender<LiveEvent>) {
    let terminal = loop {
        match ws.next().await {
            Some(Ok(Message::Text(raw))) => match serde_json::from_str::<Frame>(&raw) {
                Ok(Frame::Follow { user }) => {
                    let notice = FollowNotice {
                        nickname: user.nickname,
                        avatar: user.avatar_url,
                    };
                    if tx.send(LiveEvent::Follow(notice)).await.is_err() {
                        // Session dropped on the relay side; stop pumping.
                        return;
                    }
                }
                Ok(Frame::StreamEnd) => break LiveEvent::StreamEnd,
                Ok(Frame::Other) => {}
                Err(err) => {
                    tracing::debug!(%creator, error = %err, "skipping unparsable gateway frame");
                }
            },
            Some(Ok(Message::Ping(payload))) => {
                if ws.send(Message::Pong(payload)).await.is_err() {
                    break LiveEvent::Disconnected;
                }
            }
            Some(Ok(Message::Close(_))) | None => break LiveEvent::Disconnected,
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                tracing::warn!(%creator, error = %err, "live socket error");
                break LiveEvent::Disconnected;
            }
        }
    };

    tracing::info!(%creator, event = terminal_name(&terminal), "live session ended");
    let _ = tx.send(terminal).await;
}

fn terminal_name(ev: &LiveEvent) -> &'static str {
    match ev {
        LiveEvent::StreamEnd => "stream_end",
        LiveEvent::Disconnected => "disconnected",
        LiveEvent::Follow(_) => "follow",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_frame_parses() {
        let frame: Frame = serde_json::from_str(
            r#"{"type":"follow","user":{"nickname":"Ada","avatarUrl":"https://img/a.png"}}"#,
        )
        .unwrap();
        match frame {
            Frame::Follow { user } => {
                assert_eq!(user.nickname, "Ada");
                assert_eq!(user.avatar_url, "https://img/a.png");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn stream_end_frame_parses() {
        let frame: Frame = serde_json::from_str(r#"{"type":"streamEnd"}"#).unwrap();
        assert!(matches!(frame, Frame::StreamEnd));
    }

    #[test]
    fn unknown_frames_map_to_other() {
        let frame: Frame = serde_json::from_str(r#"{"type":"gift","value":3}"#).unwrap();
        assert!(matches!(frame, Frame::Other));
    }

    #[test]
    fn follow_frame_tolerates_missing_avatar() {
        let frame: Frame =
            serde_json::from_str(r#"{"type":"follow","user":{"nickname":"Bo"}}"#).unwrap();
        match frame {
            Frame::Follow { user } => assert_eq!(user.avatar_url, ""),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn session_url_carries_the_creator() {
        let source =
            WebcastSource::new("ws://127.0.0.1:9/live", Duration::from_secs(1), 8).unwrap();
        let url = source.session_url(&Creator::from("alice"));
        assert_eq!(url.as_str(), "ws://127.0.0.1:9/live?unique_id=alice");
    }

    #[test]
    fn bad_gateway_url_is_rejected() {
        let err = WebcastSource::new("not a url", Duration::from_secs(1), 8).unwrap_err();
        assert!(matches!(err, LiveError::Gateway(_)));
    }
}
