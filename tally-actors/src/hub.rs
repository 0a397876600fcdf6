//! Fan-out point between the relay and connected overlay clients.
//!
//! Delivery is fire-and-forget over a snapshot of the receivers registered
//! at publish time: a client whose buffer is full simply misses the notice.
//! That is the documented semantics of the overlay channel, not an
//! oversight — there is no ack, no redelivery, no ordering guarantee across
//! clients beyond per-client arrival order.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tally_common::FollowNotice;
use tokio::sync::mpsc;

pub type ClientId = u64;

/// Per-client buffer; a browser that can't drain this many notices is
/// considered slow and starts losing events.
const CLIENT_BUFFER: usize = 32;

#[derive(Clone, Default)]
pub struct OverlayHub {
    clients: Arc<DashMap<ClientId, mpsc::Sender<FollowNotice>>>,
    next_id: Arc<AtomicU64>,
}

impl OverlayHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new overlay client; the receiver gets every notice
    /// published from now on.
    pub fn register(&self) -> (ClientId, mpsc::Receiver<FollowNotice>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.insert(id, tx);
        tracing::debug!(client = id, active = self.clients.len(), "overlay client registered");
        (id, rx)
    }

    pub fn unregister(&self, id: ClientId) {
        self.clients.remove(&id);
        tracing::debug!(client = id, active = self.clients.len(), "overlay client unregistered");
    }

    /// Deliver `notice` to every currently registered client. Returns how
    /// many clients actually received it.
    pub fn publish(&self, notice: &FollowNotice) -> usize {
        let mut delivered = 0;
        for entry in self.clients.iter() {
            match entry.value().try_send(notice.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::debug!(client = *entry.key(), error = %err, "dropping notice for client");
                }
            }
        }
        delivered
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}
