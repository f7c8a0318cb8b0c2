//! Cart count extractor and its check schedule.

use crate::document::{parse_count, CartDocument};
use crate::state::{CartState, ReadSource, Reading};
use shopview_bridge::{encode, Message};
use shopview_common::{Debouncer, TimerQueue};
use shopview_core::config::CartConfig;
use shopview_core::{Millis, SharedStore, SurfaceId};
use shopview_nav::{Category, Classifier};
use tracing::{debug, trace, warn};

/// Scheduled check kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartTimer {
    /// One of the fixed-delay checks after load
    Settle,
    /// Steady safety-net poll
    Poll,
}

/// One extractor per surface. Owns its [`CartState`]; nothing is shared
/// between surfaces except the session store, keyed by surface.
pub struct CartExtractor {
    surface: SurfaceId,
    config: CartConfig,
    classifier: Classifier,
    store: SharedStore,
    state: CartState,
    timers: TimerQueue<CartTimer>,
    debouncer: Debouncer,
}

impl CartExtractor {
    pub fn new(
        surface: SurfaceId,
        config: CartConfig,
        classifier: Classifier,
        store: SharedStore,
    ) -> Self {
        let debouncer = Debouncer::new(config.debounce_ms);
        Self {
            surface,
            config,
            classifier,
            store,
            state: CartState::new(),
            timers: TimerQueue::new(),
            debouncer,
        }
    }

    pub fn state(&self) -> &CartState {
        &self.state
    }

    fn store_key(&self) -> String {
        format!("cart:last:{}", self.surface)
    }

    /// The surface (re)loaded: start from fresh state, arm the settle checks
    /// and the poll, and restore the last known count if it is still fresh.
    pub fn on_load(&mut self, now: Millis) -> Option<Message> {
        self.state = CartState::new();
        self.timers.clear();
        self.debouncer.cancel();

        for delay in &self.config.settle_checks_ms {
            self.timers
                .schedule(CartTimer::Settle, now.saturating_add(*delay));
        }
        self.timers.schedule(
            CartTimer::Poll,
            now.saturating_add(self.config.poll_interval_ms),
        );

        self.restore()
    }

    /// Emit the persisted count once. Restored values are not authoritative.
    fn restore(&mut self) -> Option<Message> {
        let stored = match self.store.get(&self.store_key()) {
            Ok(stored) => stored?,
            Err(e) => {
                warn!(surface = %self.surface, error = %e, "Failed to read last cart count");
                return None;
            }
        };
        let count = parse_count(&stored)?;
        debug!(surface = %self.surface, count, "Restored cart count");
        self.state.last_count = count;
        self.send(count, true)
    }

    /// Something in the document changed. Coalesced by the debouncer.
    pub fn on_mutation(&mut self, now: Millis) {
        let deadline = self.debouncer.trigger(now);
        trace!(surface = %self.surface, deadline, "Cart check debounced");
    }

    /// Explicit re-check (surface became active, `PING`). Bypasses dedup.
    pub fn force_check(&mut self, doc: &dyn CartDocument) -> Option<Message> {
        self.check(doc, true)
    }

    /// Run whatever checks are due at `now`.
    pub fn tick(&mut self, doc: &dyn CartDocument, now: Millis) -> Vec<Message> {
        let mut due = false;
        for fired in self.timers.pop_due(now) {
            due = true;
            if fired.key == CartTimer::Poll {
                self.timers.schedule(
                    CartTimer::Poll,
                    fired.deadline.saturating_add(self.config.poll_interval_ms),
                );
            }
        }
        if self.debouncer.fire_if_due(now) {
            due = true;
        }

        if !due {
            return Vec::new();
        }
        self.check(doc, false).into_iter().collect()
    }

    /// Earliest time [`tick`](Self::tick) has work to do
    pub fn next_deadline(&self) -> Option<Millis> {
        match (self.timers.next_deadline(), self.debouncer.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Stop all scheduled work, e.g. when the surface goes away
    pub fn stop(&mut self) {
        self.timers.clear();
        self.debouncer.cancel();
    }

    /// Read the document with the strategy list. `None` means unknown.
    pub fn read(&mut self, doc: &dyn CartDocument) -> Option<Reading> {
        let on_cart = self.classifier.classify(&doc.location()) == Category::Cart;

        if let Some(count) = doc.commerce_api().and_then(|api| api.cart_quantity()) {
            self.state.ready = true;
            self.state.confirmed_empty = count == 0;
            return Some(Reading {
                count,
                source: ReadSource::Api,
            });
        }

        let empty_marker = on_cart
            && self
                .config
                .empty_cart_selectors
                .iter()
                .any(|selector| doc.count(selector) > 0);
        if empty_marker {
            self.state.confirmed_empty = true;
        }

        let badge = self
            .config
            .badge_selectors
            .iter()
            .find_map(|badge| doc.read_badge(badge).as_deref().and_then(parse_count));
        if let Some(count) = badge {
            if !on_cart {
                self.state.ready = true;
            }
            return Some(Reading {
                count,
                source: ReadSource::Badge,
            });
        }

        if !on_cart {
            return None;
        }

        let rows = self
            .config
            .item_row_selectors
            .iter()
            .map(|selector| doc.count(selector))
            .find(|n| *n > 0);
        match rows {
            Some(n) => Some(Reading {
                count: u32::try_from(n).unwrap_or(u32::MAX),
                source: ReadSource::ItemRows,
            }),
            None if empty_marker => Some(Reading {
                count: 0,
                source: ReadSource::EmptyMarker,
            }),
            None => Some(Reading {
                count: 0,
                source: ReadSource::ItemRows,
            }),
        }
    }

    /// One check cycle: read, apply the zero rule, dedup, send.
    pub fn check(&mut self, doc: &dyn CartDocument, force: bool) -> Option<Message> {
        let Some(reading) = self.read(doc) else {
            trace!(surface = %self.surface, "No cart count found");
            return None;
        };

        let on_cart = self.classifier.classify(&doc.location()) == Category::Cart;
        let count = if reading.count > 0 {
            self.state.ready = true;
            self.state.confirmed_empty = false;
            reading.count
        } else if on_cart && !self.state.confirmed_empty {
            debug!(
                surface = %self.surface,
                source = ?reading.source,
                last = self.state.last_count,
                "Suppressing unconfirmed zero on cart page"
            );
            self.state.last_count
        } else {
            0
        };

        self.send(count, force)
    }

    fn send(&mut self, count: u32, force: bool) -> Option<Message> {
        let message = Message::CartCount { value: count };
        let wire = match encode(&message) {
            Ok(wire) => wire,
            Err(e) => {
                warn!(error = %e, "Failed to encode cart count");
                return None;
            }
        };

        if !force && self.state.last_sent.as_deref() == Some(wire.as_str()) {
            trace!(surface = %self.surface, count, "Cart count unchanged");
            return None;
        }

        self.state.last_sent = Some(wire);
        self.state.last_count = count;
        self.state.synced = true;
        if let Err(e) = self.store.set(&self.store_key(), &count.to_string()) {
            warn!(surface = %self.surface, error = %e, "Failed to persist cart count");
        }
        debug!(surface = %self.surface, count, force, "Sending cart count");
        Some(message)
    }
}
