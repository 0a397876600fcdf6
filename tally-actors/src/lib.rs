//! Actor plumbing for the live relay.
//!
//! [`actor`] and [`system`] are the generic pieces: bounded mailboxes,
//! typed addresses, broadcast shutdown. [`relay`] is the one domain actor —
//! it owns the per-creator session map — and [`hub`] is the fan-out point
//! that delivers follow notices to every connected overlay client.
pub mod actor;
pub mod hub;
pub mod relay;
pub mod system;

pub use hub::OverlayHub;
pub use relay::{RelayActor, RelayMsg};
