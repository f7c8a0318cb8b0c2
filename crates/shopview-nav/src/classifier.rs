//! Route classification and the navigation decision table.

use crate::rules::{route_key, RouteTable};
use serde::{Deserialize, Serialize};
use shopview_core::{HostTab, Platform, PurchasePolicy};
use url::Url;

/// Route category of a URL inside the embedded store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Home,
    Search,
    Cart,
    Checkout,
    Orders,
    Profile,
    Other,
}

impl Category {
    /// Cart and checkout are the purchase flow governed by platform policy
    pub fn is_purchase_flow(&self) -> bool {
        matches!(self, Category::Cart | Category::Checkout)
    }

    /// Host tab that owns this route, for post-flight tab switches
    pub fn host_tab(&self) -> Option<HostTab> {
        match self {
            Category::Cart | Category::Checkout => Some(HostTab::Cart),
            Category::Orders => Some(HostTab::Orders),
            Category::Profile => Some(HostTab::Account),
            Category::Home | Category::Search | Category::Other => None,
        }
    }
}

/// What to do with a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NavAction {
    Allow,
    BlockAndRedirectExternal,
    BlockAndSwitchTab,
}

/// Derived, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationDecision {
    pub category: Category,
    pub action: NavAction,
}

/// Pure URL classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    table: RouteTable,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(RouteTable::storefront())
    }
}

impl Classifier {
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }

    pub fn classify(&self, url: &Url) -> Category {
        self.table
            .classify_key(&route_key(url))
            .unwrap_or(Category::Other)
    }

    /// Classify a link target, resolved against the document at `base`.
    /// Targets that do not resolve are `Other`.
    pub fn classify_href(&self, href: &str, base: &Url) -> Category {
        match base.join(href.trim()) {
            Ok(url) => self.classify(&url),
            Err(_) => Category::Other,
        }
    }

    /// Pre-flight decision, the only point at which a load can be cancelled.
    pub fn decide_pre_flight(
        &self,
        url: &Url,
        platform: Platform,
        policy: PurchasePolicy,
    ) -> NavigationDecision {
        let category = self.classify(url);
        let action = if category.is_purchase_flow() && purchase_blocked(platform, policy) {
            NavAction::BlockAndRedirectExternal
        } else {
            NavAction::Allow
        };
        NavigationDecision { category, action }
    }

    /// Post-flight decision. The load already happened, so only tab switches
    /// are actionable; a blocked purchase flow is reported but left to the
    /// content-side hash guard.
    pub fn decide_post_flight(
        &self,
        url: &Url,
        platform: Platform,
        policy: PurchasePolicy,
    ) -> NavigationDecision {
        let category = self.classify(url);
        let action = if category.is_purchase_flow() && purchase_blocked(platform, policy) {
            NavAction::BlockAndRedirectExternal
        } else if category.host_tab().is_some() {
            NavAction::BlockAndSwitchTab
        } else {
            NavAction::Allow
        };
        NavigationDecision { category, action }
    }
}

fn purchase_blocked(platform: Platform, policy: PurchasePolicy) -> bool {
    !platform.is_browser() && !policy.allows_in_app()
}
