//! Short-lived, bounded key-value store.

use lru::LruCache;
use shopview_core::{Clock, KeyValueStore, Millis, ShopviewError, ShopviewResult};
use std::num::NonZeroUsize;
use std::sync::Mutex;

struct Entry {
    value: String,
    expires_at: Millis,
}

/// LRU store whose entries expire `ttl` after they were written.
///
/// Holds the last count per surface so a reload can show it before the first
/// authoritative read. Not durable.
pub struct LruSessionStore<C: Clock> {
    entries: Mutex<LruCache<String, Entry>>,
    ttl: Millis,
    clock: C,
}

impl<C: Clock> LruSessionStore<C> {
    pub fn new(capacity: usize, ttl: Millis, clock: C) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Millis {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Clock> KeyValueStore for LruSessionStore<C> {
    fn get(&self, key: &str) -> ShopviewResult<Option<String>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ShopviewError::storage("session store poisoned"))?;
        let now = self.clock.now_ms();
        let expired = match entries.get(key) {
            Some(entry) if now < entry.expires_at => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: &str) -> ShopviewResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ShopviewError::storage("session store poisoned"))?;
        entries.put(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: self.clock.now_ms().saturating_add(self.ttl),
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> ShopviewResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ShopviewError::storage("session store poisoned"))?;
        entries.pop(key);
        Ok(())
    }
}
