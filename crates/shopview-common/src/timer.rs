//! Timer queue for single-threaded event loops.
//!
//! Nothing here fires on its own: the owner asks for due timers with
//! [`TimerQueue::pop_due`] whenever its loop wakes up. Cancellation is
//! clear-and-ignore, so a callback for a timer that was already popped must
//! still re-validate state before acting.

use shopview_core::Millis;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque handle of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// A timer that came due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<K> {
    pub handle: TimerHandle,
    pub deadline: Millis,
    pub key: K,
}

/// Deadline-ordered set of keyed timers.
#[derive(Debug)]
pub struct TimerQueue<K> {
    next_id: u64,
    entries: BTreeMap<(Millis, u64), K>,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }

    /// Schedule `key` to fire at `deadline`.
    pub fn schedule(&mut self, key: K, deadline: Millis) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert((deadline, id), key);
        TimerHandle(id)
    }

    /// Cancel a timer. Returns whether it was still pending.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let slot = self
            .entries
            .keys()
            .find(|(_, id)| *id == handle.0)
            .copied();
        match slot {
            Some(slot) => self.entries.remove(&slot).is_some(),
            None => false,
        }
    }

    /// Cancel every timer whose key matches. Returns how many were removed.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, key| !predicate(key));
        before - self.entries.len()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadline(handle).is_some()
    }

    /// Deadline of a pending timer.
    pub fn deadline(&self, handle: TimerHandle) -> Option<Millis> {
        self.entries
            .keys()
            .find(|(_, id)| *id == handle.0)
            .map(|(deadline, _)| *deadline)
    }

    /// Earliest pending deadline, used by loops to decide how long to sleep.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return every timer due at `now`, earliest first.
    pub fn pop_due(&mut self, now: Millis) -> Vec<Fired<K>> {
        let later = self.entries.split_off(&(now.saturating_add(1), 0));
        let due = std::mem::replace(&mut self.entries, later);
        due.into_iter()
            .map(|((deadline, id), key)| Fired {
                handle: TimerHandle(id),
                deadline,
                key,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
