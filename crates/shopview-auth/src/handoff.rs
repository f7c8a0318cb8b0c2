//! Host-side magic-link handoff state machine.
//!
//! Owns every piece of durable handoff state: banner visibility and timers,
//! the clipboard cooldown and the login flag. Inputs are content messages and
//! user actions; outputs are [`HandoffEffect`]s the host carries out. Every
//! input re-checks the current state before acting, since content messages
//! arrive unordered and timers may fire after the state moved on.

use crate::cooldown::ClipboardCooldown;
use crate::token::{token_hash, TokenNormalizer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shopview_bridge::{LinkSource, Message};
use shopview_common::{TimerHandle, TimerQueue};
use shopview_core::config::HandoffConfig;
use shopview_core::{Millis, Rect, SharedStore, ShopviewError, ShopviewResult};
use std::fmt;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandoffPhase {
    Idle,
    LinkRequested,
    AwaitingConfirmation,
    BannerVisible,
    LinkApplied,
    LoginPending,
    LoggedIn,
}

impl fmt::Display for HandoffPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandoffPhase::Idle => "idle",
            HandoffPhase::LinkRequested => "link-requested",
            HandoffPhase::AwaitingConfirmation => "awaiting-confirmation",
            HandoffPhase::BannerVisible => "banner-visible",
            HandoffPhase::LinkApplied => "link-applied",
            HandoffPhase::LoginPending => "login-pending",
            HandoffPhase::LoggedIn => "logged-in",
        };
        f.write_str(name)
    }
}

/// Durable handoff state, one per mount of the authentication screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandoffState {
    pub has_requested_link: bool,
    pub banner_dismissed: bool,
    pub is_logged_in: bool,
    /// Blocks a second navigation from the same link
    pub applied_link_once: bool,
    pub banner_timer: Option<TimerHandle>,
    /// Deadline of `banner_timer`, 0 when none
    pub banner_deadline: Millis,
    pub last_confirmation_rect: Option<Rect>,
    pub toast_visible: bool,
    pub tried_clipboard_this_session: bool,
    pub last_attempt_at: Millis,
    pub last_processed_token_hash: Option<String>,
}

/// User-visible notices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Notice {
    /// "Couldn't sign in from that link", with a manual paste fallback
    SignInFailed,
}

/// Where a token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    Paste,
    Clipboard,
}

/// Something the host must do
#[derive(Debug, Clone, PartialEq)]
pub enum HandoffEffect {
    /// Show (or move) the "check your email" banner
    ShowBanner { top: f64 },
    HideBanner,
    ShowToast(Notice),
    HideToast,
    /// One-shot navigation of the embedded surface
    LoadInSurface(Url),
    PostToContent(Message),
    /// Analytics event, fire and forget
    Track { event: &'static str, metadata: Value },
}

/// Clipboard access
pub trait Clipboard {
    /// Current clipboard text; `None` when the clipboard holds no text.
    fn read_text(&self) -> ShopviewResult<Option<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandoffTimer {
    Banner,
    LoginCheck,
}

pub struct HandoffMachine {
    config: HandoffConfig,
    normalizer: TokenNormalizer,
    cooldown: ClipboardCooldown,
    state: HandoffState,
    phase: HandoffPhase,
    timers: TimerQueue<HandoffTimer>,
    login_check: Option<TimerHandle>,
}

impl HandoffMachine {
    pub fn new(store_url: &str, config: HandoffConfig, store: SharedStore) -> ShopviewResult<Self> {
        let normalizer = TokenNormalizer::new(store_url, &config)?;
        let cooldown = ClipboardCooldown::load(store, config.clipboard_cooldown_ms);
        let state = HandoffState {
            last_attempt_at: cooldown.record().last_attempt,
            last_processed_token_hash: cooldown.record().last_token_hash.clone(),
            ..Default::default()
        };

        Ok(Self {
            config,
            normalizer,
            cooldown,
            state,
            phase: HandoffPhase::Idle,
            timers: TimerQueue::new(),
            login_check: None,
        })
    }

    pub fn phase(&self) -> HandoffPhase {
        self.phase
    }

    pub fn state(&self) -> &HandoffState {
        &self.state
    }

    /// Logged in: timers cancelled, confirmation signals ignored
    pub fn is_suppressed(&self) -> bool {
        self.state.is_logged_in
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.timers.next_deadline()
    }

    fn set_phase(&mut self, phase: HandoffPhase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "Handoff phase");
            self.phase = phase;
        }
    }

    /// Handle a message from the content side. Messages that do not concern
    /// the handoff are ignored.
    pub fn on_message(&mut self, now: Millis, message: &Message) -> Vec<HandoffEffect> {
        match message {
            Message::MagicLinkRequested { source } => self.on_link_requested(now, *source),
            Message::EmailLinkSent {
                confirmation_visible,
                confirmation_rect,
            } => self.on_email_link_sent(now, *confirmation_visible, *confirmation_rect),
            Message::AccountLoginState { logged_in, .. } => self.on_login_state(now, *logged_in),
            Message::LoginSuccess {} => {
                self.state.applied_link_once = false;
                self.enter_logged_in("login-success")
            }
            _ => Vec::new(),
        }
    }

    fn on_link_requested(&mut self, now: Millis, source: LinkSource) -> Vec<HandoffEffect> {
        let mut effects = Vec::new();

        if self.state.is_logged_in {
            info!("Link requested while logged in, leaving suppressed state");
            self.state.is_logged_in = false;
            effects.push(HandoffEffect::PostToContent(Message::AuthState {
                logged_in: false,
            }));
        }
        if self.phase == HandoffPhase::BannerVisible {
            effects.push(HandoffEffect::HideBanner);
        }

        self.state.has_requested_link = true;
        self.state.banner_dismissed = false;
        self.state.tried_clipboard_this_session = false;
        self.state.applied_link_once = false;
        self.state.last_confirmation_rect = None;
        self.set_phase(HandoffPhase::LinkRequested);

        self.cancel_banner_timer();
        let deadline = now.saturating_add(self.config.fallback_banner_ms);
        self.schedule_banner(deadline);
        self.set_phase(HandoffPhase::AwaitingConfirmation);

        info!(?source, deadline, "Magic link requested");
        effects.push(HandoffEffect::Track {
            event: "magic_link_requested",
            metadata: json!({ "source": source }),
        });
        effects
    }

    fn on_email_link_sent(
        &mut self,
        now: Millis,
        visible: bool,
        rect: Option<Rect>,
    ) -> Vec<HandoffEffect> {
        if self.state.is_logged_in {
            debug!("Ignoring confirmation while logged in");
            return Vec::new();
        }
        if !self.state.has_requested_link || self.state.banner_dismissed {
            debug!(
                requested = self.state.has_requested_link,
                dismissed = self.state.banner_dismissed,
                "Ignoring confirmation"
            );
            return Vec::new();
        }
        let waiting = matches!(
            self.phase,
            HandoffPhase::LinkRequested
                | HandoffPhase::AwaitingConfirmation
                | HandoffPhase::BannerVisible
        );
        if !waiting || self.state.applied_link_once {
            debug!(phase = %self.phase, "Ignoring late confirmation");
            return Vec::new();
        }

        if visible {
            if rect.is_some() {
                self.state.last_confirmation_rect = rect;
            }
            self.cancel_banner_timer();
            return self.show_banner();
        }

        // The probe gave up. Make sure a banner appears at the default spot.
        match self.phase {
            HandoffPhase::AwaitingConfirmation | HandoffPhase::LinkRequested => {
                self.schedule_banner(now);
                self.poll(now)
            }
            _ => Vec::new(),
        }
    }

    fn on_login_state(&mut self, now: Millis, logged_in: bool) -> Vec<HandoffEffect> {
        if logged_in {
            return self.enter_logged_in("login-state");
        }
        if self.state.is_logged_in {
            debug!("Stale logged-out report while logged in");
            return Vec::new();
        }

        if matches!(
            self.phase,
            HandoffPhase::LinkApplied | HandoffPhase::LoginPending
        ) {
            self.set_phase(HandoffPhase::Idle);
        }
        if self.state.has_requested_link
            && !self.state.banner_dismissed
            && self.phase != HandoffPhase::BannerVisible
        {
            let deadline = now.saturating_add(self.config.fallback_banner_ms);
            if self.schedule_banner(deadline) {
                self.set_phase(HandoffPhase::AwaitingConfirmation);
            }
        }
        Vec::new()
    }

    fn enter_logged_in(&mut self, signal: &str) -> Vec<HandoffEffect> {
        if self.state.is_logged_in {
            return Vec::new();
        }

        self.timers.clear();
        self.login_check = None;
        let mut effects = vec![HandoffEffect::HideBanner];
        if self.state.toast_visible {
            effects.push(HandoffEffect::HideToast);
        }

        let applied = self.state.applied_link_once;
        self.state = HandoffState {
            is_logged_in: true,
            applied_link_once: applied,
            last_attempt_at: self.state.last_attempt_at,
            last_processed_token_hash: self.state.last_processed_token_hash.take(),
            ..Default::default()
        };
        self.set_phase(HandoffPhase::LoggedIn);

        info!(signal, "Signed in, suppressing handoff");
        effects.push(HandoffEffect::PostToContent(Message::AuthState {
            logged_in: true,
        }));
        effects.push(HandoffEffect::Track {
            event: "login_success",
            metadata: json!({ "signal": signal }),
        });
        effects
    }

    /// Arm the fallback banner timer. Only accepted if it fires strictly
    /// sooner than the one already pending.
    pub fn schedule_banner(&mut self, deadline: Millis) -> bool {
        if self.state.is_logged_in || self.state.banner_dismissed {
            return false;
        }
        if let Some(handle) = self.state.banner_timer {
            if self.timers.is_pending(handle) && self.state.banner_deadline <= deadline {
                debug!(
                    pending = self.state.banner_deadline,
                    rejected = deadline,
                    "Keeping sooner banner deadline"
                );
                return false;
            }
            self.timers.cancel(handle);
        }
        let handle = self.timers.schedule(HandoffTimer::Banner, deadline);
        self.state.banner_timer = Some(handle);
        self.state.banner_deadline = deadline;
        true
    }

    fn cancel_banner_timer(&mut self) {
        if let Some(handle) = self.state.banner_timer.take() {
            self.timers.cancel(handle);
        }
        self.state.banner_deadline = 0;
    }

    fn show_banner(&mut self) -> Vec<HandoffEffect> {
        let top = match self.state.last_confirmation_rect {
            Some(rect) => rect.bottom() + self.config.banner_gap,
            None => self.config.default_banner_top,
        };
        self.set_phase(HandoffPhase::BannerVisible);
        debug!(top, "Showing sign-in banner");
        vec![HandoffEffect::ShowBanner { top }]
    }

    /// Fire the timers due at `now`.
    pub fn poll(&mut self, now: Millis) -> Vec<HandoffEffect> {
        let mut effects = Vec::new();
        for fired in self.timers.pop_due(now) {
            match fired.key {
                HandoffTimer::Banner => effects.extend(self.on_banner_timer(fired.handle)),
                HandoffTimer::LoginCheck => effects.extend(self.on_login_check(fired.handle)),
            }
        }
        effects
    }

    fn on_banner_timer(&mut self, handle: TimerHandle) -> Vec<HandoffEffect> {
        if self.state.banner_timer != Some(handle) {
            debug!(%handle, "Stale banner timer");
            return Vec::new();
        }
        self.state.banner_timer = None;
        self.state.banner_deadline = 0;

        if self.state.is_logged_in
            || self.state.banner_dismissed
            || !self.state.has_requested_link
            || self.phase == HandoffPhase::BannerVisible
        {
            return Vec::new();
        }
        self.show_banner()
    }

    fn on_login_check(&mut self, handle: TimerHandle) -> Vec<HandoffEffect> {
        if self.login_check != Some(handle) {
            return Vec::new();
        }
        self.login_check = None;
        if self.state.is_logged_in {
            return Vec::new();
        }
        if self.phase == HandoffPhase::LinkApplied {
            self.set_phase(HandoffPhase::LoginPending);
        }
        vec![HandoffEffect::PostToContent(Message::Ping {})]
    }

    /// The surface committed a navigation: schedule a login check, later if
    /// a link was just applied so the target page can finish loading.
    pub fn on_surface_navigated(&mut self, now: Millis) {
        if self.state.is_logged_in {
            return;
        }
        let delay = if self.phase == HandoffPhase::LinkApplied {
            self.config.login_check_after_link_ms
        } else {
            self.config.login_check_delay_ms
        };
        if let Some(handle) = self.login_check.take() {
            self.timers.cancel(handle);
        }
        let handle = self
            .timers
            .schedule(HandoffTimer::LoginCheck, now.saturating_add(delay));
        self.login_check = Some(handle);
    }

    /// User closed the banner. No more fallbacks until the next request.
    pub fn dismiss_banner(&mut self) -> Vec<HandoffEffect> {
        self.state.banner_dismissed = true;
        self.cancel_banner_timer();
        if self.phase != HandoffPhase::LoggedIn {
            self.set_phase(HandoffPhase::Idle);
        }
        vec![HandoffEffect::HideBanner]
    }

    pub fn dismiss_toast(&mut self) -> Vec<HandoffEffect> {
        if !self.state.toast_visible {
            return Vec::new();
        }
        self.state.toast_visible = false;
        vec![HandoffEffect::HideToast]
    }

    /// Apply a token the user supplied. A token is only ever applied once.
    pub fn apply_token(&mut self, now: Millis, raw: &str, source: TokenSource) -> Vec<HandoffEffect> {
        if self.state.is_logged_in {
            debug!("Already signed in, ignoring token");
            return Vec::new();
        }

        let url = match self.normalizer.normalize(raw) {
            Ok(url) => url,
            Err(e) => return self.fail(source, &e),
        };
        let hash = token_hash(&url);
        if self.state.last_processed_token_hash.as_deref() == Some(hash.as_str())
            || self.cooldown.is_processed(&hash)
        {
            return self.fail(source, &ShopviewError::token("link was already used"));
        }
        if self.state.applied_link_once {
            debug!("A link was already applied for this request");
            return Vec::new();
        }

        self.state.last_processed_token_hash = Some(hash.clone());
        self.cooldown.record_token(&hash);
        self.state.applied_link_once = true;
        self.cancel_banner_timer();
        self.set_phase(HandoffPhase::LinkApplied);
        self.on_surface_navigated(now);

        info!(?source, host = url.host_str().unwrap_or(""), "Applying sign-in link");
        let mut effects = vec![HandoffEffect::HideBanner];
        if self.state.toast_visible {
            self.state.toast_visible = false;
            effects.push(HandoffEffect::HideToast);
        }
        effects.push(HandoffEffect::LoadInSurface(url));
        effects.push(HandoffEffect::Track {
            event: "magic_link_applied",
            metadata: json!({ "source": source }),
        });
        effects
    }

    /// Read the clipboard on the user's behalf, at most once per session and
    /// once per cooldown window.
    pub fn try_auto_clipboard(&mut self, now: Millis, clipboard: &dyn Clipboard) -> Vec<HandoffEffect> {
        if self.state.is_logged_in
            || !self.state.has_requested_link
            || self.state.tried_clipboard_this_session
            || self.state.applied_link_once
        {
            return Vec::new();
        }
        if !self.cooldown.may_attempt(now) {
            return Vec::new();
        }

        self.state.tried_clipboard_this_session = true;
        self.state.last_attempt_at = now;
        self.cooldown.record_attempt(now);

        match clipboard.read_text() {
            Ok(Some(text)) => self.apply_token(now, &text, TokenSource::Clipboard),
            Ok(None) => {
                debug!("Clipboard holds no text");
                Vec::new()
            }
            Err(e) => self.fail(TokenSource::Clipboard, &e),
        }
    }

    fn fail(&mut self, source: TokenSource, error: &ShopviewError) -> Vec<HandoffEffect> {
        warn!(?source, error = %error, "Could not sign in from link");
        self.state.tried_clipboard_this_session = false;
        self.state.toast_visible = true;
        vec![
            HandoffEffect::ShowToast(Notice::SignInFailed),
            HandoffEffect::Track {
                event: "magic_link_failed",
                metadata: json!({ "source": source, "reason": error.to_string() }),
            },
        ]
    }
}
