//! # Cart Count Tests
//!
//! Reconciliation of the host badge with what the embedded store shows.

use crate::{Bridge, FakeDocument};
use shopview_core::BridgeConfig;

const PRODUCT: &str = "https://shop.example.com/#!/p/5";
const CART: &str = "https://shop.example.com/#!/cart";

fn bridge_at(url: &str) -> Bridge {
    Bridge::new(BridgeConfig::default(), FakeDocument::at(url))
}

/// API count off the cart page, then a badge with the same value: one message.
#[test]
fn test_api_then_badge_same_count() {
    let mut bridge = bridge_at(PRODUCT);
    bridge.doc.set_api(Some(3));
    bridge.load();
    bridge.advance_to(150);
    assert_eq!(bridge.cart_counts, vec![3]);

    bridge.doc.remove_api();
    bridge.doc.set_text(".cart-count", "3");
    bridge.mutate();
    bridge.advance_to(1_500);
    assert_eq!(bridge.cart_counts, vec![3]);
}

/// Repeated checks of an unchanged page send nothing new.
#[test]
fn test_unchanged_count_is_sent_once() {
    let mut bridge = bridge_at(PRODUCT);
    bridge.doc.set_text(".ec-minicart__counter", " 2 ");
    bridge.load();
    for _ in 0..5 {
        bridge.mutate();
        bridge.advance(400);
    }
    bridge.advance_to(12_000);
    assert_eq!(bridge.cart_counts, vec![2]);
}

/// Unknown count off the cart page leaves the badge alone.
#[test]
fn test_no_reading_off_cart() {
    let mut bridge = bridge_at(PRODUCT);
    bridge.load();
    bridge.advance_to(6_000);
    assert!(bridge.cart_counts.is_empty());
}

/// A cart page that has not rendered its rows yet must not zero the badge.
#[test]
fn test_unconfirmed_zero_on_cart_page() {
    let mut bridge = bridge_at(CART);
    bridge.doc.set_text(".cart-count", "2");
    bridge.load();
    bridge.advance_to(150);
    assert_eq!(bridge.cart_counts, vec![2]);

    bridge.doc.remove(".cart-count");
    bridge.mutate();
    bridge.advance_to(2_500);
    assert_eq!(bridge.cart_counts, vec![2]);

    bridge.doc.set_count(".ec-cart--empty", 1);
    bridge.mutate();
    bridge.advance(400);
    assert_eq!(bridge.cart_counts, vec![2, 0]);
}

/// Item rows count on the cart page when no badge is present.
#[test]
fn test_item_rows_on_cart_page() {
    let mut bridge = bridge_at(CART);
    bridge.doc.set_count(".cart-item", 4);
    bridge.load();
    bridge.advance_to(150);
    assert_eq!(bridge.cart_counts, vec![4]);
}

/// An API zero is authoritative, even on the cart page.
#[test]
fn test_api_zero_is_confirmed() {
    let mut bridge = bridge_at(CART);
    bridge.doc.set_api(Some(1));
    bridge.load();
    bridge.advance_to(150);

    bridge.doc.set_api(Some(0));
    bridge.mutate();
    bridge.advance(400);
    assert_eq!(bridge.cart_counts, vec![1, 0]);
}

/// The last count is restored on reload, and forgotten once stale.
#[test]
fn test_restore_on_reload() {
    let mut bridge = bridge_at(PRODUCT);
    bridge.doc.set_text(".cart-count", "4");
    bridge.load();
    bridge.advance_to(150);
    assert_eq!(bridge.cart_counts, vec![4]);

    bridge.doc.clear();
    bridge.reload(PRODUCT);
    assert_eq!(bridge.cart_counts, vec![4, 4]);
    bridge.advance(6_000);
    assert_eq!(bridge.cart_counts, vec![4, 4]);

    let ttl = BridgeConfig::default().cart.store_ttl_ms;
    bridge.clock.advance(ttl + 1);
    bridge.reload(PRODUCT);
    assert_eq!(bridge.cart_counts, vec![4, 4]);
}

/// Focus and ping re-send the count even when it did not change.
#[test]
fn test_forced_checks_bypass_dedup() {
    use shopview_bridge::Message;

    let mut bridge = bridge_at(PRODUCT);
    bridge.doc.set_text(".cart-count", "1");
    bridge.load();
    bridge.advance_to(150);

    bridge.host_send(&Message::TabActive { value: true });
    bridge.host_send(&Message::Ping {});
    bridge.host_send(&Message::TabActive { value: false });
    assert_eq!(bridge.cart_counts, vec![1, 1, 1]);
}

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) as u32
    }

    fn below(&mut self, n: u32) -> u32 {
        self.next() % n
    }
}

/// Random page states on the cart route: a zero right after a positive
/// count is only ever sent while emptiness is confirmed.
#[test]
fn test_no_unconfirmed_zero_after_positive() {
    for seed in [1_u64, 7, 42, 1_234, 99_991] {
        let mut rng = Lcg(seed);
        let mut bridge = bridge_at(CART);
        bridge.load();
        let mut api: Option<u32> = None;
        let mut marker = false;
        let mut seen = 0;

        for step in 0..150 {
            match rng.below(6) {
                0 => {
                    let n = rng.below(4);
                    bridge.doc.set_text(".cart-count", &n.to_string());
                }
                1 => {
                    bridge.doc.remove(".cart-count");
                }
                2 => {
                    marker = !marker;
                    if marker {
                        bridge.doc.set_count(".ec-cart--empty", 1);
                    } else {
                        bridge.doc.remove(".ec-cart--empty");
                    }
                }
                3 => {
                    api = match rng.below(3) {
                        0 => None,
                        _ => Some(rng.below(3)),
                    };
                    match api {
                        Some(n) => bridge.doc.set_api(Some(n)),
                        None => bridge.doc.remove_api(),
                    };
                }
                4 => {
                    let rows = rng.below(3) as usize;
                    bridge.doc.set_count(".cart-item", rows);
                }
                _ => {}
            }
            bridge.mutate();
            bridge.advance(350);

            let confirmed = marker || api == Some(0);
            for i in seen.max(1)..bridge.cart_counts.len() {
                let (prev, cur) = (bridge.cart_counts[i - 1], bridge.cart_counts[i]);
                assert!(
                    !(prev > 0 && cur == 0) || confirmed,
                    "seed {} step {}: unconfirmed zero after {}",
                    seed,
                    step,
                    prev
                );
            }
            seen = bridge.cart_counts.len();
        }
    }
}
