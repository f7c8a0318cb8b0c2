//! # Navigation Tests
//!
//! Route classification, external-browser redirects, click interception and
//! the hash guard, driven from both sides of the bridge.

use crate::{Bridge, FakeDocument};
use shopview_content::ContentAction;
use shopview_core::{BridgeConfig, HostTab, Platform, PurchasePolicy};
use shopview_nav::{
    Category, ClickTarget, Classifier, ExternalCheckout, NavAction, NavEffect,
    NavigationRedirector,
};
use url::Url;

const STORE: &str = "https://shop.example.com/";
const PRODUCT: &str = "https://shop.example.com/#!/p/42";
const SEARCH: &str = "https://shop.example.com/#!/search?q=shirt";
const CART: &str = "https://shop.example.com/#!/cart";

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn config(platform: Platform, policy: PurchasePolicy) -> BridgeConfig {
    BridgeConfig {
        platform,
        purchase_policy: policy,
        ..Default::default()
    }
}

const PLATFORMS: [Platform; 3] = [Platform::Ios, Platform::Android, Platform::Web];
const POLICIES: [PurchasePolicy; 2] = [PurchasePolicy::Allow, PurchasePolicy::Disallow];

/// Decisions depend only on URL, platform and policy.
#[test]
fn test_decisions_are_pure() {
    let classifier = Classifier::default();
    let urls = [
        STORE,
        PRODUCT,
        SEARCH,
        CART,
        "https://shop.example.com/checkout/payment",
        "https://shop.example.com/basket?ref=mini",
        "https://shop.example.com/account/orders",
        "https://shop.example.com/#!/account",
        "https://shop.example.com/blog/cartography",
    ];

    for raw in urls {
        let url = url(raw);
        for platform in PLATFORMS {
            for policy in POLICIES {
                let first = classifier.decide_pre_flight(&url, platform, policy);
                let again = Classifier::default().decide_pre_flight(&url, platform, policy);
                assert_eq!(first, again, "{}", raw);

                let blocked = first.category.is_purchase_flow()
                    && platform != Platform::Web
                    && policy == PurchasePolicy::Disallow;
                let expected = if blocked {
                    NavAction::BlockAndRedirectExternal
                } else {
                    NavAction::Allow
                };
                assert_eq!(first.action, expected, "{} {:?} {:?}", raw, platform, policy);
            }
        }
    }

    assert_eq!(classifier.classify(&url(CART)), Category::Cart);
    assert_eq!(
        classifier.classify(&url("https://shop.example.com/blog/cartography")),
        Category::Other
    );
}

/// On iOS under disallow, a cart load opens the last page seen externally.
#[test]
fn test_cart_load_opens_last_page_externally() {
    let config = config(Platform::Ios, PurchasePolicy::Disallow);
    let mut redirector =
        NavigationRedirector::new(&config, Classifier::default(), Some(HostTab::Home)).unwrap();

    let preflight = redirector.should_start_load(&url(CART));
    assert!(!preflight.allow);
    assert_eq!(
        preflight.effects,
        vec![NavEffect::OpenExternal(ExternalCheckout {
            url: STORE.to_string(),
            product_id: None,
            product_name: None,
        })]
    );

    redirector.on_navigation_state_change(&url(PRODUCT));
    redirector.on_navigation_state_change(&url(CART));
    assert_eq!(redirector.last_non_cart_url(), Some(&url(PRODUCT)));

    let preflight = redirector.should_start_load(&url("https://shop.example.com/checkout"));
    assert!(!preflight.allow);
    assert_eq!(preflight.decision.category, Category::Checkout);
    assert_eq!(
        preflight.effects,
        vec![NavEffect::OpenExternal(ExternalCheckout {
            url: PRODUCT.to_string(),
            product_id: Some("42".to_string()),
            product_name: None,
        })]
    );
}

/// A browser host, or an allow policy, never blocks.
#[test]
fn test_purchase_flow_allowed() {
    for (platform, policy) in [
        (Platform::Web, PurchasePolicy::Disallow),
        (Platform::Ios, PurchasePolicy::Allow),
        (Platform::Android, PurchasePolicy::Allow),
    ] {
        let redirector = NavigationRedirector::new(
            &config(platform, policy),
            Classifier::default(),
            Some(HostTab::Home),
        )
        .unwrap();
        let preflight = redirector.should_start_load(&url(CART));
        assert!(preflight.allow);
        assert!(preflight.effects.is_empty());
    }
}

/// Committed navigations move the host to the owning tab, once per URL.
#[test]
fn test_post_flight_tab_switches() {
    let mut redirector = NavigationRedirector::new(
        &config(Platform::Android, PurchasePolicy::Allow),
        Classifier::default(),
        Some(HostTab::Home),
    )
    .unwrap();

    let orders = url("https://shop.example.com/account/orders");
    assert_eq!(
        redirector.on_navigation_state_change(&orders),
        vec![NavEffect::SwitchTab(HostTab::Orders)]
    );
    assert!(redirector.on_navigation_state_change(&orders).is_empty());
    assert_eq!(
        redirector.on_navigation_state_change(&url("https://shop.example.com/#!/account")),
        vec![NavEffect::SwitchTab(HostTab::Account)]
    );
    assert_eq!(
        redirector.on_navigation_state_change(&url(CART)),
        vec![NavEffect::SwitchTab(HostTab::Cart)]
    );
    assert!(redirector.on_navigation_state_change(&url(SEARCH)).is_empty());
    assert_eq!(redirector.last_non_cart_url(), Some(&url(SEARCH)));
}

/// A committed cart page under disallow is left to the content side.
#[test]
fn test_post_flight_cart_under_disallow() {
    let mut redirector = NavigationRedirector::new(
        &config(Platform::Ios, PurchasePolicy::Disallow),
        Classifier::default(),
        Some(HostTab::Home),
    )
    .unwrap();
    redirector.on_navigation_state_change(&url(PRODUCT));
    assert!(redirector.on_navigation_state_change(&url(CART)).is_empty());
    assert_eq!(redirector.last_non_cart_url(), Some(&url(PRODUCT)));
}

/// "Add to bag" on a product page is cancelled and handed off.
#[test]
fn test_purchase_click_intercepted() {
    let mut bridge = Bridge::new(BridgeConfig::default(), FakeDocument::at(PRODUCT));
    bridge.load();

    assert!(!bridge.click(&ClickTarget::new("Size guide")));
    assert!(bridge.external_checkouts.is_empty());

    let target = ClickTarget::new("  Add to  Bag ").with_product_name("Linen Shirt");
    assert!(bridge.click(&target));
    assert_eq!(bridge.external_checkouts, vec![PRODUCT.to_string()]);
}

/// A link into the cart counts as purchase intent; off a product page the
/// catalog is opened.
#[test]
fn test_cart_link_click_opens_catalog() {
    let mut bridge = Bridge::new(BridgeConfig::default(), FakeDocument::at(SEARCH));
    bridge.load();

    let target = ClickTarget::new("View bag").with_href(CART);
    assert!(bridge.click(&target));
    assert_eq!(bridge.external_checkouts, vec![STORE.to_string()]);
}

/// Relative cart and checkout links resolve against the page they sit on.
#[test]
fn test_relative_cart_links_intercepted() {
    let mut bridge = Bridge::new(BridgeConfig::default(), FakeDocument::at(PRODUCT));
    bridge.load();

    assert!(bridge.click(&ClickTarget::new("Bag (2)").with_href("#!/cart")));
    assert!(bridge.click(&ClickTarget::new("").with_href("/checkout")));
    assert!(!bridge.click(&ClickTarget::new("Details").with_href("#!/p/42/details")));
    assert_eq!(
        bridge.external_checkouts,
        vec![PRODUCT.to_string(), PRODUCT.to_string()]
    );
}

/// Clicks go through when the purchase flow is allowed.
#[test]
fn test_click_allowed_under_allow_policy() {
    let mut bridge = Bridge::new(
        config(Platform::Ios, PurchasePolicy::Allow),
        FakeDocument::at(PRODUCT),
    );
    bridge.load();
    assert!(!bridge.click(&ClickTarget::new("Add to bag")));
    assert!(bridge.external_checkouts.is_empty());
}

/// Hash navigation into the cart is bounced back, then cools down.
#[test]
fn test_hash_bounce_and_cooldown() {
    let mut bridge = Bridge::new(BridgeConfig::default(), FakeDocument::at(SEARCH));
    bridge.load();

    bridge.hash_change(CART);
    assert_eq!(bridge.local_actions, vec![ContentAction::GoBack]);
    assert_eq!(bridge.external_checkouts, vec![SEARCH.to_string()]);

    // the history back lands on the search page again
    bridge.hash_change(SEARCH);
    bridge.advance(1_000);
    bridge.hash_change(CART);
    assert_eq!(bridge.local_actions.len(), 1);
    assert_eq!(bridge.external_checkouts.len(), 1);

    bridge.hash_change(SEARCH);
    bridge.advance(3_000);
    bridge.hash_change(CART);
    assert_eq!(bridge.local_actions.len(), 2);
    assert_eq!(bridge.external_checkouts.len(), 2);
}

/// Cart hashes reached from a product page are left to the click interceptor.
#[test]
fn test_hash_from_product_page_not_bounced() {
    let mut bridge = Bridge::new(BridgeConfig::default(), FakeDocument::at(PRODUCT));
    bridge.load();
    bridge.hash_change(CART);
    assert!(bridge.local_actions.is_empty());
    assert!(bridge.external_checkouts.is_empty());
}

/// No bouncing on a browser host.
#[test]
fn test_hash_not_bounced_on_web() {
    let mut bridge = Bridge::new(
        config(Platform::Web, PurchasePolicy::Disallow),
        FakeDocument::at(SEARCH),
    );
    bridge.load();
    bridge.hash_change(CART);
    assert!(bridge.local_actions.is_empty());
}
