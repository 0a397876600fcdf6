//! Shared state injected into request handlers.
//!
//! Owned here, not ambient: the lookup service (with its cache), the
//! overlay hub, and the relay's address all arrive by reference so tests
//! can assemble the same surface around fakes.
use tally_actors::actor::Addr;
use tally_actors::{OverlayHub, RelayActor};
use tally_social::FollowerLookup;

pub struct AppState {
    pub lookup: FollowerLookup,
    pub hub: OverlayHub,
    pub relay: Addr<RelayActor>,
}

impl AppState {
    pub fn new(lookup: FollowerLookup, hub: OverlayHub, relay: Addr<RelayActor>) -> Self {
        Self { lookup, hub, relay }
    }
}
