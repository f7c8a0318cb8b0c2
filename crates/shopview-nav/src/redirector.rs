//! Per-surface navigation redirector.
//!
//! Wraps the classifier with the little state a surface needs: the last
//! non-purchase URL it showed (the external handoff target) and the last URL
//! a tab switch was requested for.

use crate::classifier::{Category, Classifier, NavAction, NavigationDecision};
use crate::intent::{ExternalCheckout, ProductMatcher};
use shopview_core::{BridgeConfig, HostTab, Platform, PurchasePolicy, ShopviewResult};
use url::Url;

/// Side effect requested by the redirector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEffect {
    /// Open in the external browser
    OpenExternal(ExternalCheckout),
    /// Move the host UI to another tab
    SwitchTab(HostTab),
}

/// Pre-flight verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    pub decision: NavigationDecision,
    /// Whether the load may start
    pub allow: bool,
    pub effects: Vec<NavEffect>,
}

#[derive(Debug, Clone)]
pub struct NavigationRedirector {
    classifier: Classifier,
    matcher: ProductMatcher,
    platform: Platform,
    policy: PurchasePolicy,
    store_url: Url,
    own_tab: Option<HostTab>,
    last_non_cart_url: Option<Url>,
    last_switch_url: Option<Url>,
}

impl NavigationRedirector {
    /// `own_tab` is the host tab the surface lives in; no switch is ever
    /// requested towards it.
    pub fn new(
        config: &BridgeConfig,
        classifier: Classifier,
        own_tab: Option<HostTab>,
    ) -> ShopviewResult<Self> {
        let store_url = Url::parse(&config.store_url)?;
        Ok(Self {
            classifier,
            matcher: ProductMatcher::new(&config.navigation, store_url.clone()),
            platform: config.platform,
            policy: config.purchase_policy,
            store_url,
            own_tab,
            last_non_cart_url: None,
            last_switch_url: None,
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn last_non_cart_url(&self) -> Option<&Url> {
        self.last_non_cart_url.as_ref()
    }

    /// Where a blocked purchase flow is sent: the page the user was looking
    /// at, or the catalog if nothing was seen yet.
    pub fn external_target(&self) -> ExternalCheckout {
        let url = self.last_non_cart_url.as_ref().unwrap_or(&self.store_url);
        ExternalCheckout {
            url: url.to_string(),
            product_id: self.matcher.product_id(url),
            product_name: None,
        }
    }

    /// Decide whether a load may start.
    pub fn should_start_load(&self, url: &Url) -> Preflight {
        let decision = self
            .classifier
            .decide_pre_flight(url, self.platform, self.policy);

        match decision.action {
            NavAction::BlockAndRedirectExternal => {
                let target = self.external_target();
                log::info!(
                    "Blocked {:?} load of {}, opening {} externally",
                    decision.category,
                    url,
                    target.url
                );
                Preflight {
                    decision,
                    allow: false,
                    effects: vec![NavEffect::OpenExternal(target)],
                }
            }
            NavAction::Allow | NavAction::BlockAndSwitchTab => Preflight {
                decision,
                allow: true,
                effects: Vec::new(),
            },
        }
    }

    /// React to a committed navigation. Only tab switches are produced here.
    pub fn on_navigation_state_change(&mut self, url: &Url) -> Vec<NavEffect> {
        let decision = self
            .classifier
            .decide_post_flight(url, self.platform, self.policy);

        if !decision.category.is_purchase_flow() {
            self.last_non_cart_url = Some(url.clone());
        }

        match decision.action {
            NavAction::BlockAndSwitchTab => self.switch_for(url, decision.category),
            NavAction::BlockAndRedirectExternal => {
                log::debug!(
                    "Purchase flow {} committed under disallow policy, left to hash guard",
                    url
                );
                Vec::new()
            }
            NavAction::Allow => {
                self.last_switch_url = None;
                Vec::new()
            }
        }
    }

    fn switch_for(&mut self, url: &Url, category: Category) -> Vec<NavEffect> {
        let Some(tab) = category.host_tab() else {
            return Vec::new();
        };
        if Some(tab) == self.own_tab {
            return Vec::new();
        }
        if self.last_switch_url.as_ref() == Some(url) {
            log::debug!("Tab switch for {} already requested", url);
            return Vec::new();
        }
        self.last_switch_url = Some(url.clone());
        log::info!("Switching host to {} tab for {}", tab, url);
        vec![NavEffect::SwitchTab(tab)]
    }
}
