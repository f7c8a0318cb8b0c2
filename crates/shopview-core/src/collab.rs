//! Collaborator interfaces consumed by the bridge.
//!
//! Storage, analytics transport and tab chrome live outside the bridge. They
//! are reached through these small traits so each side can be swapped for an
//! in-memory double in tests.

use crate::error::{ShopviewError, ShopviewResult};
use crate::types::{HostTab, Millis};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// String key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> ShopviewResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> ShopviewResult<()>;

    fn remove(&self, key: &str) -> ShopviewResult<()>;
}

/// Store handle shared between components of one surface
pub type SharedStore = Arc<dyn KeyValueStore + Send + Sync>;

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> ShopviewResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> ShopviewResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> ShopviewResult<()> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Rc<T> {
    fn get(&self, key: &str) -> ShopviewResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> ShopviewResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> ShopviewResult<()> {
        (**self).remove(key)
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ShopviewResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ShopviewError::storage("memory store poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ShopviewResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ShopviewError::storage("memory store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ShopviewResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ShopviewError::storage("memory store poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// Analytics transport. Fire-and-forget: implementations must not block and
/// must swallow their own failures.
pub trait EventTracker {
    fn track_event(&self, event_type: &str, metadata: serde_json::Value, user_id: Option<&str>);
}

/// Tracker that only writes a log line
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTracker;

impl EventTracker for LogTracker {
    fn track_event(&self, event_type: &str, metadata: serde_json::Value, user_id: Option<&str>) {
        log::info!(
            "track {} user={} {}",
            event_type,
            user_id.unwrap_or("-"),
            metadata
        );
    }
}

/// Host tab chrome
pub trait TabNavigator {
    fn navigate_to_tab(&self, tab: HostTab);
}

/// Source of the current time in milliseconds
pub trait Clock {
    fn now_ms(&self) -> Millis;
}

/// Wall clock, milliseconds since the unix epoch
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Millis)
            .unwrap_or(0)
    }
}

/// Manually advanced clock
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, ms: Millis) -> Millis {
        self.now.fetch_add(ms, Ordering::SeqCst) + ms
    }

    pub fn set(&self, now: Millis) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_shared_store() {
        let store = Arc::new(MemoryStore::new());
        let shared = Arc::clone(&store);
        shared.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        assert_eq!(clock.advance(250), 1_250);
        clock.set(5);
        assert_eq!(clock.now_ms(), 5);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
