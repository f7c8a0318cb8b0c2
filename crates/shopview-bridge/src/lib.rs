//! Message envelope and channel for the host/content boundary.
//!
//! Messages travel as JSON text in both directions with no ordering,
//! acknowledgement or delivery guarantee. Every consumer is expected to be
//! idempotent and to re-check its own state before acting on a message.

pub mod channel;
pub mod codec;
pub mod message;
pub mod script;

pub use channel::{Direction, LossyChannel, MessageChannel};
pub use codec::{decode, encode, receive, MAX_MESSAGE_BYTES};
pub use message::{LinkSource, Message};
pub use script::{delivery_script, CONTENT_BRIDGE_PRELUDE};
