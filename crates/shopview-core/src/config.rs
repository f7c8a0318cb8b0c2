//! Bridge configuration

use crate::error::{ShopviewError, ShopviewResult};
use crate::types::{Platform, PurchasePolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Platform the host is running on
    pub platform: Platform,

    /// Whether the in-app purchase flow is permitted
    pub purchase_policy: PurchasePolicy,

    /// Root of the embedded store, also the generic catalog fallback
    pub store_url: String,

    /// Cart count extraction
    pub cart: CartConfig,

    /// Navigation classification and redirection
    pub navigation: NavigationConfig,

    /// Magic-link handoff
    pub handoff: HandoffConfig,

    /// Confirmation probe
    pub probe: ProbeConfig,

    /// Login-state heuristics
    pub login: LoginConfig,
}

/// Where a badge count can be read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeSelector {
    /// CSS selector of the badge element
    pub selector: String,

    /// Attribute carrying the count; `None` reads the element text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl BadgeSelector {
    pub fn text(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attribute: None,
        }
    }

    pub fn attr(selector: &str, attribute: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attribute: Some(attribute.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Trailing debounce for mutation-triggered checks
    pub debounce_ms: u64,

    /// Fixed-delay checks after load, to catch late-rendering badges
    pub settle_checks_ms: Vec<u64>,

    /// Steady safety-net poll
    pub poll_interval_ms: u64,

    /// Lifetime of the per-surface last count
    pub store_ttl_ms: u64,

    /// Badge selectors, in priority order
    pub badge_selectors: Vec<BadgeSelector>,

    /// Item rows counted directly on the cart page
    pub item_row_selectors: Vec<String>,

    /// Elements that only render when the cart is known to be empty
    pub empty_cart_selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Cooldown after a hash-based cart transition was bounced
    pub hash_cooldown_ms: u64,

    /// Click texts that signal purchase intent
    pub purchase_intent_phrases: Vec<String>,

    /// Regexes with one capture group yielding a product id
    pub product_id_patterns: Vec<String>,

    /// External product URL; `{store}` and `{id}` are substituted
    pub product_url_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// Fallback delay before the banner is shown without a confirmation
    pub fallback_banner_ms: u64,

    /// Banner top when no confirmation element was found
    pub default_banner_top: f64,

    /// Gap between the confirmation element and the banner
    pub banner_gap: f64,

    /// Minimum interval between automatic clipboard reads
    pub clipboard_cooldown_ms: u64,

    /// Login check delay after an ordinary navigation
    pub login_check_delay_ms: u64,

    /// Login check delay after a link was applied
    pub login_check_after_link_ms: u64,

    /// Base URL that bare tokens are expanded against
    pub sign_in_url: String,

    /// Query parameters that carry a sign-in token
    pub token_params: Vec<String>,

    /// Window in which repeated link requests collapse into one
    pub request_dedup_ms: u64,

    /// Sign-in control texts (regex, case-insensitive)
    pub sign_in_control_patterns: Vec<String>,

    /// Outbound request URLs that request a sign-in link (substring)
    pub sign_in_request_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Total attempt budget
    pub max_attempts: u32,

    /// Attempts polled at the fast interval
    pub fast_attempts: u32,

    pub fast_interval_ms: u64,

    pub slow_interval_ms: u64,

    /// Confirmation phrases (regex, case-insensitive)
    pub phrases: Vec<String>,

    /// Confirmation element selectors
    pub selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Texts that mean the visitor is a guest; short-circuits to logged out
    pub guest_phrases: Vec<String>,

    /// Logout affordances
    pub logout_selectors: Vec<String>,

    /// Login forms
    pub login_form_selectors: Vec<String>,

    /// Cookie names or storage keys that only exist for signed-in customers
    pub auth_keys: Vec<String>,

    /// Greeting texts shown to signed-in customers
    pub welcome_phrases: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            purchase_policy: PurchasePolicy::default(),
            store_url: "https://shop.example.com/".to_string(),
            cart: CartConfig::default(),
            navigation: NavigationConfig::default(),
            handoff: HandoffConfig::default(),
            probe: ProbeConfig::default(),
            login: LoginConfig::default(),
        }
    }
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            settle_checks_ms: vec![100, 300, 600, 1000, 2000, 3000, 5000],
            poll_interval_ms: 2500,
            store_ttl_ms: 10 * 60 * 1000,
            badge_selectors: vec![
                BadgeSelector::attr("[data-cart-count]", "data-cart-count"),
                BadgeSelector::text(".ec-minicart__counter"),
                BadgeSelector::text(".cart-count"),
                BadgeSelector::text(".ec-cart-widget .ec-minicart__counter"),
                BadgeSelector::attr("[data-quantity]", "data-quantity"),
                BadgeSelector::text(".cart-badge"),
            ],
            item_row_selectors: vec![
                ".ec-cart-item".to_string(),
                ".ec-cart__products .ec-cart-item".to_string(),
                ".cart-item".to_string(),
            ],
            empty_cart_selectors: vec![
                ".ec-cart--empty".to_string(),
                ".ec-cart__message--empty".to_string(),
                ".cart-empty".to_string(),
            ],
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            hash_cooldown_ms: 3000,
            purchase_intent_phrases: vec![
                "add to bag".to_string(),
                "add to cart".to_string(),
                "buy now".to_string(),
                "checkout".to_string(),
                "check out".to_string(),
                "go to checkout".to_string(),
            ],
            product_id_patterns: vec![
                r"/p/(\d+)".to_string(),
                r"-p(\d+)(?:$|[/?#])".to_string(),
                r"/product/(\d+)".to_string(),
                r"[?&]product_?id=(\d+)".to_string(),
            ],
            product_url_template: "{store}#!/p/{id}".to_string(),
        }
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            fallback_banner_ms: 2000,
            default_banner_top: 96.0,
            banner_gap: 12.0,
            clipboard_cooldown_ms: 10 * 60 * 1000,
            login_check_delay_ms: 1200,
            login_check_after_link_ms: 4000,
            sign_in_url: "https://shop.example.com/account/login".to_string(),
            token_params: vec![
                "oobCode".to_string(),
                "token".to_string(),
                "key".to_string(),
            ],
            request_dedup_ms: 1500,
            sign_in_control_patterns: vec![
                r"\b(send|get|email)( me)?( a)? (sign[- ]?in|login|magic) link\b".to_string(),
                r"\bcontinue with email\b".to_string(),
                r"\bsign in with email\b".to_string(),
            ],
            sign_in_request_patterns: vec![
                "sendOobCode".to_string(),
                "sendSignInLinkToEmail".to_string(),
                "magic-link".to_string(),
                "/auth/link".to_string(),
                "login-link".to_string(),
            ],
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            fast_attempts: 8,
            fast_interval_ms: 350,
            slow_interval_ms: 900,
            phrases: vec![
                r"check your (e-?)?mail".to_string(),
                r"we('ve| have) (just )?sent".to_string(),
                r"(link|email) (has been |was )?sent".to_string(),
                r"sent you an? (sign[- ]?in|login|magic) link".to_string(),
            ],
            selectors: vec![
                ".ec-signin__message--sent".to_string(),
                "[data-email-sent]".to_string(),
                ".email-link-sent".to_string(),
            ],
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            guest_phrases: vec![
                r"\bguest\b".to_string(),
                r"\bnot signed in\b".to_string(),
            ],
            logout_selectors: vec![
                "[data-action='logout']".to_string(),
                ".ec-cart__account-logout".to_string(),
                "a[href*='logout']".to_string(),
            ],
            login_form_selectors: vec![
                "form.ec-signin".to_string(),
                "input[type='email'][name='email']".to_string(),
                "form[action*='login']".to_string(),
            ],
            auth_keys: vec![
                "customer_token".to_string(),
                "ec_customer".to_string(),
                "session_customer".to_string(),
            ],
            welcome_phrases: vec![
                r"\bwelcome back\b".to_string(),
                r"\bsigned in as\b".to_string(),
                r"\bmy orders\b".to_string(),
            ],
        }
    }
}

impl BridgeConfig {
    /// Default config location
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shopview")
            .join("config.json")
    }

    /// Load configuration from a JSON file.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: &Path) -> ShopviewResult<Self> {
        if !path.exists() {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            ShopviewError::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> ShopviewResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| ShopviewError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Reject settings that would stall or spin the schedulers
    pub fn validate(&self) -> ShopviewResult<()> {
        url::Url::parse(&self.store_url)?;
        url::Url::parse(&self.handoff.sign_in_url)?;

        if self.cart.debounce_ms == 0 || self.cart.poll_interval_ms == 0 {
            return Err(ShopviewError::config("cart intervals must be non-zero"));
        }
        if self.cart.badge_selectors.is_empty() {
            return Err(ShopviewError::config("cart.badge_selectors is empty"));
        }
        if self.probe.fast_interval_ms == 0 || self.probe.slow_interval_ms == 0 {
            return Err(ShopviewError::config("probe intervals must be non-zero"));
        }
        if self.probe.fast_attempts > self.probe.max_attempts {
            return Err(ShopviewError::config(format!(
                "probe.fast_attempts ({}) exceeds probe.max_attempts ({})",
                self.probe.fast_attempts, self.probe.max_attempts
            )));
        }
        if self.probe.phrases.is_empty() && self.probe.selectors.is_empty() {
            return Err(ShopviewError::config(
                "probe needs at least one phrase or selector",
            ));
        }
        if self.handoff.fallback_banner_ms == 0 {
            return Err(ShopviewError::config("handoff.fallback_banner_ms is zero"));
        }
        Ok(())
    }
}
