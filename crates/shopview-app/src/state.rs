//! Application state management
//!
//! The host owns one navigation redirector and one handoff machine for its
//! embedded store surface, plus the collaborators they drive. Components
//! return effects; this module is where effects turn into host calls.

use crate::ipc::StateInfo;
use crate::surface::{HostShell, MemoryClipboard};
use serde_json::json;
use shopview_auth::{HandoffEffect, HandoffMachine, HandoffPhase};
use shopview_bridge::{delivery_script, Message};
use shopview_core::{
    BridgeConfig, EventTracker, HostTab, Millis, SharedStore, ShopviewResult,
};
use shopview_nav::{Classifier, ExternalCheckout, NavEffect, NavigationRedirector};
use tracing::{debug, info, warn};
use url::Url;

/// Host tab the store surface lives in
pub const SURFACE_TAB: HostTab = HostTab::Home;

pub struct AppState {
    redirector: NavigationRedirector,
    handoff: HandoffMachine,
    host: Box<dyn HostShell>,
    tracker: Box<dyn EventTracker + Send>,
    clipboard: MemoryClipboard,
    cart_badge: Option<u32>,
    surface_url: Option<Url>,
    user_id: Option<String>,
}

impl AppState {
    pub fn new(
        config: BridgeConfig,
        store: SharedStore,
        host: Box<dyn HostShell>,
        tracker: Box<dyn EventTracker + Send>,
    ) -> ShopviewResult<Self> {
        config.validate()?;
        let redirector =
            NavigationRedirector::new(&config, Classifier::default(), Some(SURFACE_TAB))?;
        let handoff = HandoffMachine::new(&config.store_url, config.handoff.clone(), store)?;

        Ok(Self {
            redirector,
            handoff,
            host,
            tracker,
            clipboard: MemoryClipboard::new(),
            cart_badge: None,
            surface_url: None,
            user_id: None,
        })
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn handoff(&self) -> &HandoffMachine {
        &self.handoff
    }

    pub fn redirector(&self) -> &NavigationRedirector {
        &self.redirector
    }

    pub fn redirector_mut(&mut self) -> &mut NavigationRedirector {
        &mut self.redirector
    }

    pub fn host(&self) -> &dyn HostShell {
        self.host.as_ref()
    }

    pub fn clipboard(&self) -> &MemoryClipboard {
        &self.clipboard
    }

    pub fn set_surface_url(&mut self, url: Url) {
        self.surface_url = Some(url);
    }

    /// Update the badge. Repeats of the current value are not redrawn.
    pub fn set_cart_badge(&mut self, count: u32) -> bool {
        if self.cart_badge == Some(count) {
            return false;
        }
        self.cart_badge = Some(count);
        self.host.set_cart_badge(count);
        true
    }

    /// Run `f` against the handoff machine and carry out what it asks for.
    pub fn drive_handoff<F>(&mut self, f: F)
    where
        F: FnOnce(&mut HandoffMachine, &MemoryClipboard) -> Vec<HandoffEffect>,
    {
        let effects = f(&mut self.handoff, &self.clipboard);
        self.apply_handoff(effects);
    }

    pub fn apply_handoff(&mut self, effects: Vec<HandoffEffect>) {
        for effect in effects {
            match effect {
                HandoffEffect::ShowBanner { top } => self.host.show_banner(top),
                HandoffEffect::HideBanner => self.host.hide_banner(),
                HandoffEffect::ShowToast(notice) => self.host.show_toast(notice),
                HandoffEffect::HideToast => self.host.hide_toast(),
                HandoffEffect::LoadInSurface(url) => {
                    self.host.load_url(url.as_str());
                    self.surface_url = Some(url);
                }
                HandoffEffect::PostToContent(message) => self.post_to_content(&message),
                HandoffEffect::Track { event, metadata } => self.track(event, metadata),
            }
        }
    }

    pub fn apply_nav(&self, effects: Vec<NavEffect>) {
        for effect in effects {
            match effect {
                NavEffect::OpenExternal(checkout) => self.open_external(&checkout, "preflight"),
                NavEffect::SwitchTab(tab) => self.host.navigate_to_tab(tab),
            }
        }
    }

    /// Hand a purchase over to the system browser. Only http(s) targets are
    /// opened.
    pub fn open_external(&self, checkout: &ExternalCheckout, origin: &str) {
        let url = match Url::parse(&checkout.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                warn!(scheme = url.scheme(), "Refusing external checkout target");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Discarding unparseable external checkout target");
                return;
            }
        };

        info!(%url, origin, "Opening checkout in external browser");
        self.host.open(url.as_str());
        self.track(
            "external_checkout_opened",
            json!({
                "url": url.as_str(),
                "productId": checkout.product_id,
                "productName": checkout.product_name,
                "origin": origin,
            }),
        );
    }

    /// Deliver a host -> content message by evaluating a script in the
    /// surface. Delivery is best effort.
    pub fn post_to_content(&self, message: &Message) {
        match delivery_script(message) {
            Ok(script) => {
                debug!(message_type = message.type_name(), "Posting to content");
                self.host.evaluate_script(&script);
            }
            Err(e) => warn!(error = %e, "Could not render delivery script"),
        }
    }

    pub fn track(&self, event: &str, metadata: serde_json::Value) {
        self.tracker
            .track_event(event, metadata, self.user_id.as_deref());
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.handoff.next_deadline()
    }

    /// Fire due timers
    pub fn poll(&mut self, now: Millis) {
        let effects = self.handoff.poll(now);
        self.apply_handoff(effects);
    }

    pub fn snapshot(&self) -> StateInfo {
        let handoff = self.handoff.state();
        StateInfo {
            phase: self.handoff.phase().to_string(),
            logged_in: handoff.is_logged_in,
            banner_visible: self.handoff.phase() == HandoffPhase::BannerVisible,
            banner_dismissed: handoff.banner_dismissed,
            cart_badge: self.cart_badge,
            surface_url: self.surface_url.as_ref().map(Url::to_string),
            last_non_cart_url: self.redirector.last_non_cart_url().map(Url::to_string),
        }
    }
}
