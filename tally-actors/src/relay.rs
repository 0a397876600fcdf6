//! Actor that owns the live-session map.
//!
//! One session per creator, ever. Subscribe requests for a creator that is
//! already connecting or connected are duplicates and get dropped; session
//! teardown goes back through the mailbox, so map reads and writes are
//! serialized with everything else. A subscribe racing a teardown in the
//! mailbox is treated as a duplicate — the client re-sends on its next
//! "set creator" and reconnects cleanly.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tally_common::Creator;
use tally_live::{LiveEvent, LiveSession, LiveSource};
use tokio::task::JoinHandle;

use crate::actor::{Actor, Addr, Context};
use crate::hub::OverlayHub;

#[derive(Debug)]
pub enum RelayMsg {
    /// An overlay client asked to watch this creator.
    Subscribe { creator: Creator },
    /// A session's pump finished (stream end, disconnect, or channel loss).
    SessionEnded { creator: Creator },
}

struct SessionHandle {
    pump: JoinHandle<()>,
}

pub struct RelayActor {
    source: Arc<dyn LiveSource>,
    hub: OverlayHub,
    sessions: HashMap<Creator, SessionHandle>,
}

impl RelayActor {
    pub fn new(source: Arc<dyn LiveSource>, hub: OverlayHub) -> Self {
        Self {
            source,
            hub,
            sessions: HashMap::new(),
        }
    }

    async fn subscribe(&mut self, creator: Creator, ctx: &mut Context<Self>) {
        if self.sessions.contains_key(&creator) {
            tracing::debug!(%creator, "already subscribed; ignoring");
            return;
        }

        // Connect inside the handler: a second Subscribe for the same
        // creator waits in the mailbox and sees the session entry.
        let session = match self.source.connect(&creator).await {
            Ok(session) => session,
            Err(err) => {
                // No subscriber-visible error channel; the overlay keeps
                // polling counts regardless.
                tracing::warn!(%creator, error = %err, "live connect failed");
                return;
            }
        };

        let pump = spawn_pump(session, self.hub.clone(), ctx.addr());
        self.sessions.insert(creator, SessionHandle { pump });
    }

    fn session_ended(&mut self, creator: &Creator) {
        if let Some(handle) = self.sessions.remove(creator) {
            tracing::info!(%creator, "live session removed");
            // No-op when the pump already returned.
            handle.pump.abort();
        }
    }
}

/// Forward follow events to the hub until the session ends, then report
/// back so the actor can clear its map entry.
fn spawn_pump(
    mut session: LiveSession,
    hub: OverlayHub,
    relay: Addr<RelayActor>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let creator = session.creator().clone();
        loop {
            match session.next_event().await {
                Some(LiveEvent::Follow(notice)) => {
                    let delivered = hub.publish(&notice);
                    tracing::debug!(%creator, nickname = %notice.nickname, delivered, "follow relayed");
                }
                Some(LiveEvent::StreamEnd) => {
                    tracing::info!(%creator, "stream ended");
                    break;
                }
                Some(LiveEvent::Disconnected) | None => {
                    tracing::info!(%creator, "live session disconnected");
                    break;
                }
            }
        }
        let _ = relay
            .send(RelayMsg::SessionEnded { creator })
            .await;
    })
}

#[async_trait::async_trait]
impl Actor for RelayActor {
    type Msg = RelayMsg;

    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            RelayMsg::Subscribe { creator } => self.subscribe(creator, ctx).await,
            RelayMsg::SessionEnded { creator } => self.session_ended(&creator),
        }
        Ok(())
    }
}
