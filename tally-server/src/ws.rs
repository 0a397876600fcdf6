//! The persistent overlay channel.
//!
//! A connected widget sends `setCreator` once (or again, whenever its
//! configuration changes) and receives every `newSubscriber` notice the
//! relay publishes — regardless of which client asked for the creator.
//! There is no per-client routing and no delivery guarantee.
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tally_actors::RelayMsg;
use tally_common::{Creator, FollowNotice};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    SetCreator { creator: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    NewSubscriber { nickname: String, avatar: String },
}

impl From<FollowNotice> for ServerMessage {
    fn from(notice: FollowNotice) -> Self {
        ServerMessage::NewSubscriber {
            nickname: notice.nickname,
            avatar: notice.avatar,
        }
    }
}

/// `GET /ws` — upgrade and hand the socket to the connection loop.
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let (client_id, mut notices) = state.hub.register();
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            maybe_notice = notices.recv() => {
                match maybe_notice {
                    Some(notice) => {
                        if forward_notice(&mut ws_tx, notice).await.is_err() {
                            break;
                        }
                    }
                    // Hub entry gone; nothing more to deliver.
                    None => break,
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&text, &state, client_id).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(client = client_id, error = %err, "websocket error");
                        break;
                    }
                    // Pings are answered by axum itself.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.unregister(client_id);
}

async fn forward_notice(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    notice: FollowNotice,
) -> Result<(), axum::Error> {
    let msg = ServerMessage::from(notice);
    let text = match serde_json::to_string(&msg) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "failed to encode server message");
            return Ok(());
        }
    };
    ws_tx.send(Message::Text(text)).await
}

async fn handle_client_message(text: &str, state: &Arc<AppState>, client_id: u64) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::SetCreator { creator }) => {
            tracing::info!(client = client_id, %creator, "overlay requested creator");
            let subscribe = RelayMsg::Subscribe {
                creator: Creator::from(creator),
            };
            if state.relay.send(subscribe).await.is_err() {
                tracing::warn!(client = client_id, "relay mailbox closed; subscribe dropped");
            }
        }
        Err(err) => {
            tracing::debug!(client = client_id, error = %err, "ignoring unrecognized client message");
        }
    }
}
