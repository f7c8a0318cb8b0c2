//! Loop guard for hash-based pseudo-navigations.
//!
//! Single-page storefronts route with `#!/...` fragments, which never reach
//! the pre-flight hook. The content side watches those transitions and bounces
//! purchase-flow hashes back, with a cooldown so the observer that sees the
//! bounce does not trigger it again.

use crate::classifier::Classifier;
use crate::intent::ProductMatcher;
use shopview_core::{Millis, Platform, PurchasePolicy};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashOutcome {
    Ignore,
    /// Go back locally; `back_to` is the URL before the transition
    Bounce { back_to: Url },
}

#[derive(Debug, Clone)]
pub struct HashGuard {
    cooldown_ms: Millis,
    cooldown_until: Option<Millis>,
    classifier: Classifier,
    matcher: ProductMatcher,
    platform: Platform,
    policy: PurchasePolicy,
}

impl HashGuard {
    pub fn new(
        classifier: Classifier,
        matcher: ProductMatcher,
        platform: Platform,
        policy: PurchasePolicy,
        cooldown_ms: Millis,
    ) -> Self {
        Self {
            cooldown_ms,
            cooldown_until: None,
            classifier,
            matcher,
            platform,
            policy,
        }
    }

    pub fn in_cooldown(&self, now: Millis) -> bool {
        self.cooldown_until.map(|until| now < until).unwrap_or(false)
    }

    /// Observe a hash transition from `from` to `to`.
    ///
    /// Transitions that start on a product page are left alone: those are the
    /// purchase-intent clicks, already handled by the click interceptor.
    pub fn on_hash_change(&mut self, now: Millis, from: &Url, to: &Url) -> HashOutcome {
        if from.fragment() == to.fragment() && from.path() == to.path() {
            return HashOutcome::Ignore;
        }
        if self.platform.is_browser() || self.policy.allows_in_app() {
            return HashOutcome::Ignore;
        }
        if !self.classifier.classify(to).is_purchase_flow() {
            return HashOutcome::Ignore;
        }
        if self.matcher.is_product_page(from) {
            log::debug!("Cart hash reached from product page {}, not bouncing", from);
            return HashOutcome::Ignore;
        }
        if self.in_cooldown(now) {
            log::debug!("Hash guard cooling down, ignoring {}", to);
            return HashOutcome::Ignore;
        }

        self.cooldown_until = Some(now.saturating_add(self.cooldown_ms));
        log::info!("Bouncing hash navigation {} back to {}", to, from);
        HashOutcome::Bounce {
            back_to: from.clone(),
        }
    }

    /// Forget the cooldown, e.g. after the surface reloads.
    pub fn reset(&mut self) {
        self.cooldown_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopview_core::config::NavigationConfig;

    fn guard(policy: PurchasePolicy) -> HashGuard {
        let store = Url::parse("https://shop.example.com/").unwrap();
        HashGuard::new(
            Classifier::default(),
            ProductMatcher::new(&NavigationConfig::default(), store),
            Platform::Ios,
            policy,
            3000,
        )
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_bounce_then_cooldown() {
        let mut guard = guard(PurchasePolicy::Disallow);
        let from = url("https://shop.example.com/#!/search?q=tea");
        let to = url("https://shop.example.com/#!/cart");

        assert_eq!(
            guard.on_hash_change(1_000, &from, &to),
            HashOutcome::Bounce {
                back_to: from.clone()
            }
        );
        assert!(guard.in_cooldown(1_500));
        assert_eq!(guard.on_hash_change(2_000, &from, &to), HashOutcome::Ignore);
        assert_eq!(guard.on_hash_change(3_999, &from, &to), HashOutcome::Ignore);
        assert!(matches!(
            guard.on_hash_change(4_000, &from, &to),
            HashOutcome::Bounce { .. }
        ));
    }

    #[test]
    fn test_cooldown_deadline_saturates() {
        let store = Url::parse("https://shop.example.com/").unwrap();
        let mut guard = HashGuard::new(
            Classifier::default(),
            ProductMatcher::new(&NavigationConfig::default(), store),
            Platform::Android,
            PurchasePolicy::Disallow,
            Millis::MAX,
        );
        let from = url("https://shop.example.com/#!/search");
        let to = url("https://shop.example.com/#!/checkout");

        assert!(matches!(
            guard.on_hash_change(1_000, &from, &to),
            HashOutcome::Bounce { .. }
        ));
        assert!(guard.in_cooldown(Millis::MAX - 1));
        assert_eq!(guard.on_hash_change(Millis::MAX - 1, &from, &to), HashOutcome::Ignore);
    }

    #[test]
    fn test_product_page_origin_ignored() {
        let mut guard = guard(PurchasePolicy::Disallow);
        let outcome = guard.on_hash_change(
            0,
            &url("https://shop.example.com/#!/green-tea/p/42"),
            &url("https://shop.example.com/#!/cart"),
        );
        assert_eq!(outcome, HashOutcome::Ignore);
        assert!(!guard.in_cooldown(0));
    }

    #[test]
    fn test_non_purchase_hash_ignored() {
        let mut guard = guard(PurchasePolicy::Disallow);
        let outcome = guard.on_hash_change(
            0,
            &url("https://shop.example.com/#!/"),
            &url("https://shop.example.com/#!/account/orders"),
        );
        assert_eq!(outcome, HashOutcome::Ignore);
    }

    #[test]
    fn test_allow_policy_ignored() {
        let mut guard = guard(PurchasePolicy::Allow);
        let outcome = guard.on_hash_change(
            0,
            &url("https://shop.example.com/#!/"),
            &url("https://shop.example.com/#!/checkout"),
        );
        assert_eq!(outcome, HashOutcome::Ignore);
    }

    #[test]
    fn test_reset_clears_cooldown() {
        let mut guard = guard(PurchasePolicy::Disallow);
        let from = url("https://shop.example.com/#!/");
        let to = url("https://shop.example.com/#!/cart");
        guard.on_hash_change(0, &from, &to);
        guard.reset();
        assert!(!guard.in_cooldown(10));
    }
}
