//! Per-surface cart state.

use serde::{Deserialize, Serialize};

/// Strategy that produced a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadSource {
    Api,
    Badge,
    ItemRows,
    EmptyMarker,
}

impl ReadSource {
    /// API reads are ground truth
    pub fn is_authoritative(&self) -> bool {
        matches!(self, ReadSource::Api)
    }
}

/// One successful read of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub count: u32,
    pub source: ReadSource,
}

/// Recreated on every (re)load of the surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Last count sent to the host
    pub last_count: u32,
    /// Set after the first authoritative read
    pub ready: bool,
    /// Emptiness was confirmed; only then may a zero be sent from the cart page
    pub confirmed_empty: bool,
    /// Wire form of the last `CART_COUNT` sent
    pub last_sent: Option<String>,
    /// At least one count was sent since load
    pub synced: bool,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }
}
