//! # Handoff Tests
//!
//! The magic-link handoff end to end: request detection, the confirmation
//! probe, banner placement and the login-state hand back.

use crate::{Bridge, FakeDocument};
use shopview_auth::{HandoffEffect, HandoffMachine, HandoffPhase, Notice, TokenSource};
use shopview_bridge::{LinkSource, Message};
use shopview_core::config::HandoffConfig;
use shopview_core::{BridgeConfig, MemoryStore, Rect, SharedStore};
use shopview_nav::ClickTarget;
use std::sync::Arc;

const LOGIN_PAGE: &str = "https://shop.example.com/account/login";
const LINK: &str = "https://shop.example.com/account/login?oobCode=a1b2c3d4e5f6";
const OTHER_LINK: &str = "https://shop.example.com/account/login?oobCode=z9y8x7w6v5u4";

fn machine(store: SharedStore) -> HandoffMachine {
    HandoffMachine::new("https://shop.example.com/", HandoffConfig::default(), store).unwrap()
}

fn requested() -> Message {
    Message::MagicLinkRequested {
        source: LinkSource::Click,
    }
}

fn send_link() -> ClickTarget {
    ClickTarget::new("Send me a sign-in link")
}

fn login_page() -> Bridge {
    let mut bridge = Bridge::new(BridgeConfig::default(), FakeDocument::at(LOGIN_PAGE));
    bridge.load();
    bridge
}

fn confirmation() -> Rect {
    Rect::new(16.0, 200.0, 340.0, 40.0)
}

/// Two banner deadlines in either order: one banner, at the sooner one.
#[test]
fn test_sooner_banner_deadline_wins() {
    for order in [[1_000, 1_500], [1_500, 1_000]] {
        let mut handoff = machine(Arc::new(MemoryStore::new()));
        handoff.on_message(0, &requested());
        for deadline in order {
            handoff.schedule_banner(deadline);
        }
        assert_eq!(handoff.next_deadline(), Some(1_000));

        let mut shown = Vec::new();
        for now in (0..=3_000).step_by(50) {
            for effect in handoff.poll(now) {
                if let HandoffEffect::ShowBanner { top } = effect {
                    shown.push((now, top));
                }
            }
        }
        assert_eq!(shown, vec![(1_000, 96.0)], "order {:?}", order);
    }
}

/// Probe exhaustion while still waiting shows the banner at once.
#[test]
fn test_probe_exhaustion_shows_default_banner() {
    let mut handoff = machine(Arc::new(MemoryStore::new()));
    handoff.on_message(0, &requested());

    let effects = handoff.on_message(
        100,
        &Message::EmailLinkSent {
            confirmation_visible: false,
            confirmation_rect: None,
        },
    );
    assert_eq!(effects, vec![HandoffEffect::ShowBanner { top: 96.0 }]);
    assert_eq!(handoff.phase(), HandoffPhase::BannerVisible);
    assert!(handoff.poll(2_000).is_empty());
}

/// A token is applied once; a repeat fails visibly, a second token for the
/// same request is ignored.
#[test]
fn test_token_applied_once() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let mut handoff = machine(store.clone());
    handoff.on_message(0, &requested());

    let effects = handoff.apply_token(500, LINK, TokenSource::Paste);
    assert!(effects
        .iter()
        .any(|e| matches!(e, HandoffEffect::LoadInSurface(url) if url.as_str() == LINK)));
    assert_eq!(handoff.phase(), HandoffPhase::LinkApplied);

    let effects = handoff.apply_token(600, LINK, TokenSource::Paste);
    assert_eq!(effects[0], HandoffEffect::ShowToast(Notice::SignInFailed));
    assert!(!effects
        .iter()
        .any(|e| matches!(e, HandoffEffect::LoadInSurface(_))));

    assert!(handoff
        .apply_token(700, OTHER_LINK, TokenSource::Paste)
        .is_empty());

    // a fresh request allows a new link
    handoff.on_message(5_000, &requested());
    let effects = handoff.apply_token(5_100, OTHER_LINK, TokenSource::Paste);
    assert!(effects
        .iter()
        .any(|e| matches!(e, HandoffEffect::LoadInSurface(_))));

    // the last applied link stays used after a restart
    let mut restarted = machine(store);
    restarted.on_message(0, &requested());
    let effects = restarted.apply_token(100, OTHER_LINK, TokenSource::Paste);
    assert_eq!(effects[0], HandoffEffect::ShowToast(Notice::SignInFailed));
}

/// Text that is not a sign-in link is refused with a notice.
#[test]
fn test_garbage_paste_fails() {
    let mut handoff = machine(Arc::new(MemoryStore::new()));
    handoff.on_message(0, &requested());
    let effects = handoff.apply_token(100, "hello there", TokenSource::Paste);
    assert_eq!(effects[0], HandoffEffect::ShowToast(Notice::SignInFailed));
    assert!(handoff.state().toast_visible);
    assert_eq!(handoff.dismiss_toast(), vec![HandoffEffect::HideToast]);
    assert!(handoff.dismiss_toast().is_empty());
}

/// Request, confirmation on the fourth probe, banner under the message.
#[test]
fn test_banner_placed_under_confirmation() {
    let mut bridge = login_page();
    assert!(!bridge.click(&send_link()));
    assert_eq!(bridge.handoff.phase(), HandoffPhase::AwaitingConfirmation);

    bridge.advance_to(1_050);
    assert_eq!(bridge.agent.probe().attempts(), 3);
    assert!(bridge.banner_tops().is_empty());

    bridge
        .doc
        .add_text_block("Check your email for a sign-in link", confirmation());
    bridge.advance_to(1_400);
    assert_eq!(bridge.agent.probe().attempts(), 4);
    assert_eq!(bridge.banner_tops(), vec![confirmation().bottom() + 12.0]);
    assert_eq!(bridge.handoff.phase(), HandoffPhase::BannerVisible);

    bridge.advance_to(5_000);
    assert_eq!(bridge.banner_tops(), vec![252.0]);
}

/// No confirmation at all: the fallback banner at the default spot, once.
#[test]
fn test_fallback_banner_without_confirmation() {
    let mut bridge = login_page();
    bridge.click(&send_link());

    bridge.advance_to(1_999);
    assert!(bridge.banner_tops().is_empty());
    bridge.advance_to(2_000);
    assert_eq!(bridge.banner_tops(), vec![96.0]);

    bridge.advance_to(30_000);
    assert!(!bridge.agent.probe().is_running());
    assert_eq!(bridge.agent.probe().attempts(), 30);
    assert_eq!(bridge.banner_tops(), vec![96.0]);
}

/// A dismissed banner stays down until the next request.
#[test]
fn test_dismissed_banner_stays_down() {
    let mut bridge = login_page();
    bridge
        .doc
        .add_text_block("Check your email for a sign-in link", confirmation());
    bridge.click(&send_link());
    bridge.advance_to(400);
    assert_eq!(bridge.banner_tops().len(), 1);

    bridge.dismiss_banner();
    assert_eq!(bridge.host_effects.last(), Some(&HandoffEffect::HideBanner));
    assert_eq!(bridge.handoff.phase(), HandoffPhase::Idle);

    bridge.content_send(&Message::EmailLinkSent {
        confirmation_visible: false,
        confirmation_rect: None,
    });
    bridge.content_send(&Message::EmailLinkSent {
        confirmation_visible: true,
        confirmation_rect: Some(confirmation()),
    });
    bridge.advance_to(10_000);
    assert_eq!(bridge.banner_tops().len(), 1);

    bridge.click(&send_link());
    bridge.advance_to(10_400);
    assert_eq!(bridge.banner_tops().len(), 2);
}

/// Signed in while the fallback is pending: the banner never shows and the
/// content stops probing.
#[test]
fn test_login_cancels_pending_banner() {
    let mut bridge = login_page();
    bridge.click(&send_link());
    bridge.advance_to(500);

    bridge.content_send(&Message::AccountLoginState {
        logged_in: true,
        debug: None,
    });
    assert_eq!(bridge.handoff.phase(), HandoffPhase::LoggedIn);
    assert!(bridge.handoff.is_suppressed());
    assert!(bridge.host_effects.contains(&HandoffEffect::HideBanner));
    assert!(bridge.agent.is_suppressed());
    assert!(!bridge.agent.probe().is_running());

    bridge.advance_to(5_000);
    assert!(bridge.banner_tops().is_empty());

    // stale logged-out report
    bridge.content_send(&Message::AccountLoginState {
        logged_in: false,
        debug: None,
    });
    assert_eq!(bridge.handoff.phase(), HandoffPhase::LoggedIn);
}

/// A new request after signing in starts over on both sides.
#[test]
fn test_new_request_leaves_suppressed_state() {
    let mut bridge = login_page();
    bridge.content_send(&Message::LoginSuccess {});
    assert!(bridge.agent.is_suppressed());

    bridge.advance_to(2_000);
    bridge.click(&send_link());
    assert!(!bridge.handoff.is_suppressed());
    assert!(!bridge.agent.is_suppressed());
    assert_eq!(bridge.handoff.phase(), HandoffPhase::AwaitingConfirmation);

    bridge.advance_to(4_000);
    assert_eq!(bridge.banner_tops(), vec![96.0]);
}

/// Applied link, page loads signed in, the delayed login check confirms it.
#[test]
fn test_applied_link_confirmed_by_login_check() {
    let mut bridge = login_page();
    bridge.click(&send_link());
    bridge.advance_to(500);

    bridge.paste(LINK);
    assert_eq!(bridge.handoff.phase(), HandoffPhase::LinkApplied);
    assert_eq!(bridge.surface_loads().len(), 1);

    bridge.doc.clear();
    bridge.doc.add_storage_key("customer_token");
    bridge.reload("https://shop.example.com/account");

    bridge.advance_to(4_499);
    assert_eq!(bridge.handoff.phase(), HandoffPhase::LinkApplied);
    assert!(bridge.banner_tops().is_empty());

    bridge.advance_to(4_500);
    assert_eq!(bridge.handoff.phase(), HandoffPhase::LoggedIn);
    assert!(bridge.agent.is_suppressed());

    bridge.paste(LINK);
    assert_eq!(bridge.surface_loads().len(), 1);
}

/// A confirmation still in flight when the link is applied does not bring
/// the banner back, and the longer login check still runs.
#[test]
fn test_confirmation_racing_applied_link() {
    let mut bridge = login_page();
    bridge.click(&send_link());
    bridge.advance_to(500);

    bridge.paste(LINK);
    bridge.content_send(&Message::EmailLinkSent {
        confirmation_visible: true,
        confirmation_rect: Some(confirmation()),
    });
    assert!(bridge.banner_tops().is_empty());
    assert_eq!(bridge.handoff.phase(), HandoffPhase::LinkApplied);

    bridge.doc.clear();
    bridge.doc.add_storage_key("customer_token");
    bridge.reload("https://shop.example.com/account");
    bridge.advance_to(4_500);
    assert_eq!(bridge.handoff.phase(), HandoffPhase::LoggedIn);
    assert!(bridge.banner_tops().is_empty());
}

/// A login-state check on an ordinary navigation, with the guest text
/// winning over a stale auth key.
#[test]
fn test_guest_page_is_logged_out() {
    let mut bridge = login_page();
    bridge.doc.set_body("Hello, guest").add_storage_key("ec_customer");
    bridge.committed();
    bridge.advance_to(1_200);
    assert_eq!(bridge.handoff.phase(), HandoffPhase::Idle);
    assert!(!bridge.handoff.is_suppressed());

    bridge.doc.set_body("Welcome back, Sam");
    bridge.host_send(&Message::Ping {});
    assert_eq!(bridge.handoff.phase(), HandoffPhase::LoggedIn);
}
