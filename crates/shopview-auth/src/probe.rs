//! Confirmation probe.
//!
//! After a link request, polls the document for a "check your email" sign.
//! Bounded: 30 attempts by default, 350ms apart for the first 8 and 900ms
//! after that. Exhaustion is reported, not swallowed, so the host can still
//! show its banner at the default position.

use crate::document::{compile_patterns, AuthDocument};
use regex::Regex;
use shopview_bridge::Message;
use shopview_common::PollSchedule;
use shopview_core::config::ProbeConfig;
use shopview_core::{Millis, Rect};
use tracing::{debug, info};

/// What a successful attempt found
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeHit {
    /// A confirmation element or text element, with its geometry
    Element(Rect),
    /// Confirmation text somewhere on the page, element not located
    PageText,
}

pub struct ConfirmationProbe {
    schedule: PollSchedule,
    phrases: Vec<Regex>,
    selectors: Vec<String>,
    attempt: u32,
    next_at: Option<Millis>,
}

impl ConfirmationProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            schedule: PollSchedule::from_config(config),
            phrases: compile_patterns(&config.phrases),
            selectors: config.selectors.clone(),
            attempt: 0,
            next_at: None,
        }
    }

    /// (Re)start polling from `now`. A running probe starts over.
    pub fn start(&mut self, now: Millis) {
        self.attempt = 0;
        self.next_at = self
            .schedule
            .delay_for_attempt(1)
            .map(|delay| now.saturating_add(delay));
        debug!(next_at = ?self.next_at, "Confirmation probe started");
    }

    pub fn stop(&mut self) {
        if self.next_at.take().is_some() {
            debug!(attempt = self.attempt, "Confirmation probe stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.next_at.is_some()
    }

    /// Attempts made since the last start
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.next_at
    }

    /// Look once, without touching the schedule.
    pub fn look(&self, doc: &dyn AuthDocument) -> Option<ProbeHit> {
        for selector in &self.selectors {
            if let Some(rect) = doc.element_rect(selector).filter(Rect::is_visible) {
                return Some(ProbeHit::Element(rect));
            }
        }
        for phrase in &self.phrases {
            if let Some(rect) = doc.text_rect(phrase).filter(Rect::is_visible) {
                return Some(ProbeHit::Element(rect));
            }
        }
        let body = doc.body_text();
        if self.phrases.iter().any(|phrase| phrase.is_match(&body)) {
            return Some(ProbeHit::PageText);
        }
        None
    }

    /// Run the attempt due at `now`, if any. Returns the probe result once:
    /// on the first hit, or when the attempt budget runs out.
    pub fn tick(&mut self, doc: &dyn AuthDocument, now: Millis) -> Option<Message> {
        match self.next_at {
            Some(at) if now >= at => {}
            _ => return None,
        }

        self.attempt += 1;
        if let Some(hit) = self.look(doc) {
            self.next_at = None;
            info!(attempt = self.attempt, hit = ?hit, "Sign-in email confirmation found");
            let confirmation_rect = match hit {
                ProbeHit::Element(rect) => Some(rect),
                ProbeHit::PageText => None,
            };
            return Some(Message::EmailLinkSent {
                confirmation_visible: true,
                confirmation_rect,
            });
        }

        match self.schedule.delay_for_attempt(self.attempt + 1) {
            Some(delay) => {
                self.next_at = Some(now.saturating_add(delay));
                None
            }
            None => {
                self.next_at = None;
                info!(attempts = self.attempt, "No sign-in email confirmation found");
                Some(Message::EmailLinkSent {
                    confirmation_visible: false,
                    confirmation_rect: None,
                })
            }
        }
    }
}
