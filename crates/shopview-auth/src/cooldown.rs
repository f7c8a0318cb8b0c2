//! Rate limit for automatic clipboard reads.

use serde::{Deserialize, Serialize};
use shopview_core::{Millis, SharedStore, ShopviewError, ShopviewResult};
use tracing::{debug, warn};

/// Store key of the persisted record
pub const COOLDOWN_KEY: &str = "auth:clipboard-cooldown";

/// Persisted across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownRecord {
    /// Last automatic clipboard read, 0 if never
    pub last_attempt: Millis,
    /// Hash of the last token that was applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_token_hash: Option<String>,
}

/// Gate in front of automatic clipboard reads: one per cooldown window, and
/// never the same token twice.
pub struct ClipboardCooldown {
    store: SharedStore,
    cooldown_ms: Millis,
    record: CooldownRecord,
}

impl ClipboardCooldown {
    /// Load the record; an unreadable one counts as no record.
    pub fn load(store: SharedStore, cooldown_ms: Millis) -> Self {
        let record = match Self::read(&store) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable clipboard cooldown record");
                CooldownRecord::default()
            }
        };
        Self {
            store,
            cooldown_ms,
            record,
        }
    }

    fn read(store: &SharedStore) -> ShopviewResult<CooldownRecord> {
        match store.get(COOLDOWN_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                ShopviewError::storage(format!("bad cooldown record: {}", e))
            }),
            None => Ok(CooldownRecord::default()),
        }
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.record)
            .map_err(ShopviewError::from)
            .and_then(|raw| self.store.set(COOLDOWN_KEY, &raw));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist clipboard cooldown");
        }
    }

    pub fn record(&self) -> &CooldownRecord {
        &self.record
    }

    pub fn may_attempt(&self, now: Millis) -> bool {
        if self.record.last_attempt == 0 {
            return true;
        }
        let ready_at = self.record.last_attempt.saturating_add(self.cooldown_ms);
        if now < ready_at {
            debug!(ready_at, now, "Clipboard read cooling down");
            return false;
        }
        true
    }

    pub fn record_attempt(&mut self, now: Millis) {
        self.record.last_attempt = now;
        self.persist();
    }

    pub fn is_processed(&self, hash: &str) -> bool {
        self.record.last_token_hash.as_deref() == Some(hash)
    }

    pub fn record_token(&mut self, hash: &str) {
        self.record.last_token_hash = Some(hash.to_string());
        self.persist();
    }
}
