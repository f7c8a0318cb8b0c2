//! Purchase-intent click interception and product URL resolution.

use crate::classifier::Classifier;
use crate::rules::route_key;
use regex::Regex;
use serde::{Deserialize, Serialize};
use shopview_core::config::NavigationConfig;
use shopview_core::{BridgeConfig, Platform, PurchasePolicy, ShopviewResult};
use url::Url;

/// Target of an external-browser handoff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCheckout {
    pub url: String,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
}

/// Extracts product identifiers from store URLs
#[derive(Debug, Clone)]
pub struct ProductMatcher {
    patterns: Vec<Regex>,
    template: String,
    store_url: Url,
}

impl ProductMatcher {
    pub fn new(config: &NavigationConfig, store_url: Url) -> Self {
        let patterns = config
            .product_id_patterns
            .iter()
            .filter_map(|p| match Regex::new(&format!("(?i){}", p)) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("Skipping invalid product pattern {}: {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            patterns,
            template: config.product_url_template.clone(),
            store_url,
        }
    }

    /// First product id found in the URL's path, query or hash
    pub fn product_id(&self, url: &Url) -> Option<String> {
        let key = route_key(url);
        self.patterns.iter().find_map(|re| {
            re.captures(&key)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
    }

    pub fn is_product_page(&self, url: &Url) -> bool {
        self.product_id(url).is_some()
    }

    pub fn product_url(&self, id: &str) -> String {
        self.template
            .replace("{store}", self.store_url.as_str())
            .replace("{id}", id)
    }

    /// Generic catalog fallback
    pub fn catalog_url(&self) -> &Url {
        &self.store_url
    }

    /// Product page for the current URL, falling back to the catalog
    pub fn resolve(&self, current: &Url, product_name: Option<&str>) -> ExternalCheckout {
        match self.product_id(current) {
            Some(id) => ExternalCheckout {
                url: self.product_url(&id),
                product_id: Some(id),
                product_name: product_name.map(str::to_string),
            },
            None => ExternalCheckout {
                url: self.store_url.to_string(),
                product_id: None,
                product_name: product_name.map(str::to_string),
            },
        }
    }
}

/// The element a click landed on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
    /// Visible text of the control
    pub text: String,
    pub href: Option<String>,
    /// Product title shown near the control, if any
    pub product_name: Option<String>,
}

impl ClickTarget {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Let the click through
    Proceed,
    /// Cancel at the source and hand off to an external browser
    Cancel(ExternalCheckout),
}

/// Detects "add to bag" / "checkout" clicks under a disallow policy.
#[derive(Debug, Clone)]
pub struct PurchaseIntent {
    phrases: Vec<String>,
    matcher: ProductMatcher,
    classifier: Classifier,
    platform: Platform,
    policy: PurchasePolicy,
}

impl PurchaseIntent {
    pub fn new(config: &BridgeConfig, classifier: Classifier) -> ShopviewResult<Self> {
        let store_url = Url::parse(&config.store_url)?;
        Ok(Self {
            phrases: config
                .navigation
                .purchase_intent_phrases
                .iter()
                .map(|p| normalize_text(p))
                .collect(),
            matcher: ProductMatcher::new(&config.navigation, store_url),
            classifier,
            platform: config.platform,
            policy: config.purchase_policy,
        })
    }

    pub fn matcher(&self) -> &ProductMatcher {
        &self.matcher
    }

    /// Purchase wording on the control, or a link into the purchase flow.
    /// Relative links resolve against `current`.
    pub fn is_purchase_intent(&self, target: &ClickTarget, current: &Url) -> bool {
        let text = normalize_text(&target.text);
        if !text.is_empty() && self.phrases.iter().any(|p| text.contains(p.as_str())) {
            return true;
        }
        target
            .href
            .as_deref()
            .map(|href| {
                self.classifier
                    .classify_href(href, current)
                    .is_purchase_flow()
            })
            .unwrap_or(false)
    }

    /// Decide a click on `target` while the document is at `current`.
    pub fn on_click(&self, target: &ClickTarget, current: &Url) -> ClickOutcome {
        if self.platform.is_browser() || self.policy.allows_in_app() {
            return ClickOutcome::Proceed;
        }
        if !self.is_purchase_intent(target, current) {
            return ClickOutcome::Proceed;
        }

        let checkout = self
            .matcher
            .resolve(current, target.product_name.as_deref());
        log::info!(
            "Purchase intent '{}' cancelled, handing off {}",
            target.text.trim(),
            checkout.url
        );
        ClickOutcome::Cancel(checkout)
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
