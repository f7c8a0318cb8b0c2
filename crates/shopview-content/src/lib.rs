//! Content side of the shopview bridge.
//!
//! One [`ContentAgent`] per embedded surface load. It sees the document, the
//! user's clicks and outbound requests, and talks to the host only through
//! bridge messages.

pub mod agent;

pub use agent::{dispatch, ClickDecision, ContentAction, ContentAgent, ContentDocument};
