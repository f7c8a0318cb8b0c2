//! Shopview Core Library
//!
//! This crate provides shared types, errors, configuration and the
//! collaborator interfaces used by both sides of the shopview bridge.

pub mod collab;
pub mod config;
pub mod error;
pub mod types;

pub use collab::{
    Clock, EventTracker, KeyValueStore, LogTracker, ManualClock, MemoryStore, SharedStore,
    SystemClock, TabNavigator,
};
pub use config::BridgeConfig;
pub use error::{ShopviewError, ShopviewResult};
pub use types::{HostTab, Millis, Platform, PurchasePolicy, Rect, SurfaceId};
