//! Detection of sign-in link requests inside the document.

use crate::document::compile_patterns;
use regex::Regex;
use shopview_bridge::{LinkSource, Message};
use shopview_core::config::HandoffConfig;
use shopview_core::Millis;
use tracing::debug;

/// Watches clicks and outbound requests for a sign-in link request. A click
/// on "send link" is usually followed by the request it fires, so detections
/// within `request_dedup_ms` of each other collapse into one.
pub struct LinkRequestDetector {
    controls: Vec<Regex>,
    request_patterns: Vec<String>,
    dedup_ms: Millis,
    last_at: Option<Millis>,
}

impl LinkRequestDetector {
    pub fn new(config: &HandoffConfig) -> Self {
        Self {
            controls: compile_patterns(&config.sign_in_control_patterns),
            request_patterns: config
                .sign_in_request_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            dedup_ms: config.request_dedup_ms,
            last_at: None,
        }
    }

    pub fn is_sign_in_control(&self, text: &str) -> bool {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        self.controls.iter().any(|re| re.is_match(&text))
    }

    pub fn is_sign_in_request(&self, url: &str) -> bool {
        let url = url.to_lowercase();
        self.request_patterns.iter().any(|p| url.contains(p.as_str()))
    }

    pub fn on_click(&mut self, now: Millis, text: &str) -> Option<Message> {
        if !self.is_sign_in_control(text) {
            return None;
        }
        self.detected(now, LinkSource::Click)
    }

    pub fn on_request(&mut self, now: Millis, url: &str) -> Option<Message> {
        if !self.is_sign_in_request(url) {
            return None;
        }
        self.detected(now, LinkSource::Request)
    }

    fn detected(&mut self, now: Millis, source: LinkSource) -> Option<Message> {
        if let Some(last) = self.last_at {
            if now.saturating_sub(last) < self.dedup_ms {
                debug!(?source, "Link request already reported");
                return None;
            }
        }
        self.last_at = Some(now);
        debug!(?source, "Sign-in link requested");
        Some(Message::MagicLinkRequested { source })
    }
}
