//! Live-broadcast session driver.
//!
//! The platform's live protocol (signing, room resolution, protobuf
//! framing) is handled by an externally maintained webcast gateway; this
//! crate only speaks the gateway's JSON frame format and exposes the
//! [`LiveSource`] seam so the relay — and tests — never care which
//! implementation is behind it.
pub mod source;
pub mod webcast;

pub use source::{DisabledSource, LiveError, LiveEvent, LiveSession, LiveSource};
pub use webcast::WebcastSource;
