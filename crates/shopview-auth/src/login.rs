//! Login-state heuristics.
//!
//! Ordered checks against markup we do not control. Expect these to drift
//! when the store changes its templates; the `debug` payload of
//! `ACCOUNT_LOGIN_STATE` says which signal decided, so misfires can be
//! spotted in the host logs.

use crate::document::{compile_patterns, AuthDocument};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shopview_bridge::Message;
use shopview_core::config::LoginConfig;

/// The check that decided a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoginSignal {
    GuestText,
    LogoutAffordance,
    LoginForm,
    AuthKey,
    WelcomeText,
    NoSignal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginVerdict {
    pub logged_in: bool,
    pub signal: LoginSignal,
    /// What matched, for the debug payload
    pub evidence: Option<String>,
}

impl LoginVerdict {
    fn new(logged_in: bool, signal: LoginSignal, evidence: Option<String>) -> Self {
        Self {
            logged_in,
            signal,
            evidence,
        }
    }

    pub fn to_message(&self) -> Message {
        Message::AccountLoginState {
            logged_in: self.logged_in,
            debug: Some(json!({
                "signal": self.signal,
                "evidence": self.evidence,
            })),
        }
    }
}

pub struct LoginDetector {
    guest: Vec<Regex>,
    welcome: Vec<Regex>,
    logout_selectors: Vec<String>,
    login_form_selectors: Vec<String>,
    auth_keys: Vec<String>,
}

impl LoginDetector {
    pub fn new(config: &LoginConfig) -> Self {
        Self {
            guest: compile_patterns(&config.guest_phrases),
            welcome: compile_patterns(&config.welcome_phrases),
            logout_selectors: config.logout_selectors.clone(),
            login_form_selectors: config.login_form_selectors.clone(),
            auth_keys: config.auth_keys.clone(),
        }
    }

    /// First matching check wins. Guest text short-circuits to logged out.
    pub fn detect(&self, doc: &dyn AuthDocument) -> LoginVerdict {
        let body = doc.body_text();

        if let Some(re) = self.guest.iter().find(|re| re.is_match(&body)) {
            return LoginVerdict::new(false, LoginSignal::GuestText, Some(re.to_string()));
        }
        if let Some(selector) = self.logout_selectors.iter().find(|s| doc.exists(s)) {
            return LoginVerdict::new(true, LoginSignal::LogoutAffordance, Some(selector.clone()));
        }
        if let Some(selector) = self.login_form_selectors.iter().find(|s| doc.exists(s)) {
            return LoginVerdict::new(false, LoginSignal::LoginForm, Some(selector.clone()));
        }
        if let Some(key) = self.auth_keys.iter().find(|k| doc.has_storage_key(k)) {
            return LoginVerdict::new(true, LoginSignal::AuthKey, Some(key.clone()));
        }
        if let Some(re) = self.welcome.iter().find(|re| re.is_match(&body)) {
            return LoginVerdict::new(true, LoginSignal::WelcomeText, Some(re.to_string()));
        }
        LoginVerdict::new(false, LoginSignal::NoSignal, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopview_core::Rect;

    #[derive(Default)]
    struct Page {
        body: String,
        elements: Vec<&'static str>,
        keys: Vec<&'static str>,
    }

    impl AuthDocument for Page {
        fn body_text(&self) -> String {
            self.body.clone()
        }

        fn exists(&self, selector: &str) -> bool {
            self.elements.iter().any(|e| *e == selector)
        }

        fn element_rect(&self, _selector: &str) -> Option<Rect> {
            None
        }

        fn text_rect(&self, _pattern: &Regex) -> Option<Rect> {
            None
        }

        fn has_storage_key(&self, key: &str) -> bool {
            self.keys.iter().any(|k| *k == key)
        }
    }

    fn detector() -> LoginDetector {
        LoginDetector::new(&LoginConfig::default())
    }

    #[test]
    fn test_guest_text_short_circuits() {
        let page = Page {
            body: "Hello, Guest! Welcome back".into(),
            elements: vec!["a[href*='logout']"],
            keys: vec!["customer_token"],
        };
        let verdict = detector().detect(&page);
        assert!(!verdict.logged_in);
        assert_eq!(verdict.signal, LoginSignal::GuestText);
    }

    #[test]
    fn test_logout_affordance_beats_login_form() {
        let page = Page {
            elements: vec!["[data-action='logout']", "form.ec-signin"],
            ..Default::default()
        };
        let verdict = detector().detect(&page);
        assert!(verdict.logged_in);
        assert_eq!(verdict.signal, LoginSignal::LogoutAffordance);
    }

    #[test]
    fn test_login_form_means_logged_out() {
        let page = Page {
            elements: vec!["form.ec-signin"],
            keys: vec!["customer_token"],
            ..Default::default()
        };
        assert_eq!(detector().detect(&page).signal, LoginSignal::LoginForm);
    }

    #[test]
    fn test_auth_key_then_welcome_then_default() {
        let with_key = Page {
            keys: vec!["ec_customer"],
            ..Default::default()
        };
        assert_eq!(detector().detect(&with_key).signal, LoginSignal::AuthKey);

        let welcome = Page {
            body: "Welcome back, Sam".into(),
            ..Default::default()
        };
        assert!(detector().detect(&welcome).logged_in);

        let verdict = detector().detect(&Page::default());
        assert!(!verdict.logged_in);
        assert_eq!(verdict.signal, LoginSignal::NoSignal);
    }

    #[test]
    fn test_message_carries_debug() {
        let verdict = LoginVerdict::new(true, LoginSignal::AuthKey, Some("ec_customer".into()));
        match verdict.to_message() {
            Message::AccountLoginState { logged_in, debug } => {
                assert!(logged_in);
                let debug = debug.unwrap();
                assert_eq!(debug["signal"], "auth-key");
                assert_eq!(debug["evidence"], "ec_customer");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
