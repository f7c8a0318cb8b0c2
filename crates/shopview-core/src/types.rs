//! Common types used throughout shopview

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds, either since the unix epoch (wall clock) or since an
/// arbitrary origin (test clocks). Only differences are ever compared.
pub type Millis = u64;

/// Unique identifier for an embedded surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl SurfaceId {
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Host-side tabs that the bridge can ask the host to switch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostTab {
    Home,
    Search,
    Cart,
    Orders,
    Account,
}

impl HostTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostTab::Home => "home",
            HostTab::Search => "search",
            HostTab::Cart => "cart",
            HostTab::Orders => "orders",
            HostTab::Account => "account",
        }
    }
}

impl fmt::Display for HostTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform the host is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Ios,
    Android,
    Web,
}

impl Platform {
    /// Whether the host is itself a full browser, in which case there is no
    /// "external" browser to hand off to.
    pub fn is_browser(&self) -> bool {
        matches!(self, Platform::Web)
    }
}

/// Whether the in-app purchase flow is permitted on the current platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PurchasePolicy {
    Allow,
    #[default]
    Disallow,
}

impl PurchasePolicy {
    pub fn allows_in_app(&self) -> bool {
        matches!(self, PurchasePolicy::Allow)
    }
}

/// Bounding box of an element inside the embedded document, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// A zero-area rect is reported by hidden elements
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}
