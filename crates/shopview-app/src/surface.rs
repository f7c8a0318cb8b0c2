//! Host-side collaborators of the bridge.
//!
//! The embedded surface, the external browser and the host chrome (cart
//! badge, banner, toast) are platform UI. The bridge only reaches them through
//! these traits. `HeadlessHost` implements all of them by recording
//! [`HostAction`]s, which the headless runtime prints as JSON lines.
//!
//! All calls happen on the host's event loop.

use crate::ipc::HostAction;
use shopview_auth::{Clipboard, Notice};
use shopview_core::{HostTab, ShopviewError, ShopviewResult, TabNavigator};
use std::sync::{Arc, Mutex};

/// The embedded store surface
pub trait EmbeddedSurface {
    /// Load a URL in the surface
    fn load_url(&self, url: &str);

    /// Evaluate JavaScript in the surface (fire-and-forget)
    fn evaluate_script(&self, script: &str);
}

/// System browser used for the external purchase handoff
pub trait ExternalBrowser {
    fn open(&self, url: &str);
}

/// Host UI around the surface
pub trait HostChrome {
    fn set_cart_badge(&self, count: u32);

    /// Show or move the "check your email" banner, `top` in surface points
    fn show_banner(&self, top: f64);

    fn hide_banner(&self);

    fn show_toast(&self, notice: Notice);

    fn hide_toast(&self);
}

/// Everything the host state drives
pub trait HostShell: EmbeddedSurface + ExternalBrowser + TabNavigator + HostChrome + Send {}

impl<T: EmbeddedSurface + ExternalBrowser + TabNavigator + HostChrome + Send> HostShell for T {}

impl<T: EmbeddedSurface + ?Sized> EmbeddedSurface for Arc<T> {
    fn load_url(&self, url: &str) {
        (**self).load_url(url)
    }

    fn evaluate_script(&self, script: &str) {
        (**self).evaluate_script(script)
    }
}

/// Actions recorded by a [`HeadlessHost`], in call order
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    actions: Arc<Mutex<Vec<HostAction>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, action: HostAction) {
        if let Ok(mut actions) = self.actions.lock() {
            actions.push(action);
        }
    }

    /// Take everything recorded so far
    pub fn drain(&self) -> Vec<HostAction> {
        self.actions
            .lock()
            .map(|mut actions| std::mem::take(&mut *actions))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.actions.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Host without a platform UI
#[derive(Debug, Clone, Default)]
pub struct HeadlessHost {
    log: ActionLog,
}

impl HeadlessHost {
    pub fn new(log: ActionLog) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }
}

impl EmbeddedSurface for HeadlessHost {
    fn load_url(&self, url: &str) {
        self.log.push(HostAction::LoadUrl {
            url: url.to_string(),
        });
    }

    fn evaluate_script(&self, script: &str) {
        self.log.push(HostAction::EvaluateScript {
            script: script.to_string(),
        });
    }
}

impl ExternalBrowser for HeadlessHost {
    fn open(&self, url: &str) {
        self.log.push(HostAction::OpenExternal {
            url: url.to_string(),
        });
    }
}

impl TabNavigator for HeadlessHost {
    fn navigate_to_tab(&self, tab: HostTab) {
        self.log.push(HostAction::SwitchTab { tab });
    }
}

impl HostChrome for HeadlessHost {
    fn set_cart_badge(&self, count: u32) {
        self.log.push(HostAction::CartBadge { count });
    }

    fn show_banner(&self, top: f64) {
        self.log.push(HostAction::ShowBanner { top });
    }

    fn hide_banner(&self) {
        self.log.push(HostAction::HideBanner);
    }

    fn show_toast(&self, notice: Notice) {
        self.log.push(HostAction::ShowToast { notice });
    }

    fn hide_toast(&self) {
        self.log.push(HostAction::HideToast);
    }
}

/// Clipboard whose contents are set by the host process
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
    denied: Mutex<bool>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&self, text: Option<String>) {
        if let Ok(mut current) = self.text.lock() {
            *current = text;
        }
    }

    /// Simulate a permission refusal
    pub fn set_denied(&self, denied: bool) {
        if let Ok(mut current) = self.denied.lock() {
            *current = denied;
        }
    }
}

impl Clipboard for MemoryClipboard {
    fn read_text(&self) -> ShopviewResult<Option<String>> {
        let denied = self
            .denied
            .lock()
            .map_err(|_| ShopviewError::clipboard("clipboard poisoned"))?;
        if *denied {
            return Err(ShopviewError::clipboard("permission denied"));
        }
        let text = self
            .text
            .lock()
            .map_err(|_| ShopviewError::clipboard("clipboard poisoned"))?;
        Ok(text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_host_records_in_order() {
        let host = HeadlessHost::new(ActionLog::new());
        host.set_cart_badge(2);
        host.navigate_to_tab(HostTab::Orders);
        host.load_url("https://shop.example.com/");

        assert_eq!(
            host.log().drain(),
            vec![
                HostAction::CartBadge { count: 2 },
                HostAction::SwitchTab {
                    tab: HostTab::Orders
                },
                HostAction::LoadUrl {
                    url: "https://shop.example.com/".into()
                },
            ]
        );
        assert!(host.log().is_empty());
    }

    #[test]
    fn test_cloned_host_shares_log() {
        let log = ActionLog::new();
        let host = HeadlessHost::new(log.clone());
        let surface = Arc::new(host.clone());
        surface.evaluate_script("1");
        host.open("https://shop.example.com/p/1");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_memory_clipboard() {
        let clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.read_text().unwrap(), None);

        clipboard.set_text(Some("hello".into()));
        assert_eq!(clipboard.read_text().unwrap().as_deref(), Some("hello"));

        clipboard.set_denied(true);
        assert!(clipboard.read_text().is_err());
    }
}
