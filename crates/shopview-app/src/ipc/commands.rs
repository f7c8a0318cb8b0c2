//! IPC command handlers
//!
//! Commands from the platform shell get a reply. Messages from the content
//! side are fire-and-forget: they are decoded defensively and anything that
//! does not fit is logged and dropped.

use super::{HostCommand, IpcResponse};
use crate::state::AppState;
use serde_json::json;
use shopview_auth::TokenSource;
use shopview_bridge::{receive, Direction, Message};
use shopview_core::Millis;
use shopview_nav::ExternalCheckout;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use url::Url;

fn lock(state: &Arc<Mutex<AppState>>) -> Option<MutexGuard<'_, AppState>> {
    match state.lock() {
        Ok(guard) => Some(guard),
        Err(_) => {
            warn!("Application state poisoned");
            None
        }
    }
}

/// Handle a command from the platform shell
pub fn handle_command(state: &Arc<Mutex<AppState>>, now: Millis, command: HostCommand) -> IpcResponse {
    let Some(mut state) = lock(state) else {
        return IpcResponse::error("application state unavailable");
    };

    match command {
        // Navigation commands
        HostCommand::ShouldStartLoad { url } => handle_should_start_load(&state, &url),
        HostCommand::NavigationStateChange { url } => {
            handle_navigation_state_change(&mut state, now, &url)
        }

        // Surface commands
        HostCommand::TabFocus { active } => handle_tab_focus(&state, active),
        HostCommand::Ping => handle_ping(&state),
        HostCommand::Foreground => handle_foreground(&mut state, now),

        // Handoff commands
        HostCommand::PasteLink { text } => handle_paste_link(&mut state, now, &text),
        HostCommand::SetClipboard { text, denied } => handle_set_clipboard(&state, text, denied),
        HostCommand::DismissBanner => handle_dismiss_banner(&mut state),
        HostCommand::DismissToast => handle_dismiss_toast(&mut state),

        HostCommand::GetState => IpcResponse::success(state.snapshot()),
    }
}

// Navigation handlers

fn handle_should_start_load(state: &AppState, url: &str) -> IpcResponse {
    let url = match Url::parse(url) {
        Ok(url) => url,
        Err(e) => return IpcResponse::error(format!("Invalid URL {}: {}", url, e)),
    };

    let preflight = state.redirector().should_start_load(&url);
    debug!(%url, allow = preflight.allow, "Pre-flight");
    let response = json!({
        "allow": preflight.allow,
        "category": preflight.decision.category,
        "action": preflight.decision.action,
    });
    state.apply_nav(preflight.effects);
    IpcResponse::success(response)
}

fn handle_navigation_state_change(state: &mut AppState, now: Millis, url: &str) -> IpcResponse {
    let url = match Url::parse(url) {
        Ok(url) => url,
        Err(e) => return IpcResponse::error(format!("Invalid URL {}: {}", url, e)),
    };

    info!(%url, "Surface navigated");
    let effects = state.redirector_mut().on_navigation_state_change(&url);
    let category = state.redirector().classifier().classify(&url);
    state.set_surface_url(url);
    state.apply_nav(effects);
    state.drive_handoff(|handoff, _| {
        handoff.on_surface_navigated(now);
        Vec::new()
    });
    IpcResponse::success(json!({ "category": category }))
}

// Surface handlers

fn handle_tab_focus(state: &AppState, active: bool) -> IpcResponse {
    info!(active, "Surface focus changed");
    state.post_to_content(&Message::TabActive { value: active });
    IpcResponse::success(json!({ "active": active }))
}

fn handle_ping(state: &AppState) -> IpcResponse {
    state.post_to_content(&Message::Ping {});
    IpcResponse::success(json!({ "pinged": true }))
}

fn handle_foreground(state: &mut AppState, now: Millis) -> IpcResponse {
    info!("App in foreground");
    state.drive_handoff(|handoff, clipboard| handoff.try_auto_clipboard(now, clipboard));
    IpcResponse::success(json!({ "phase": state.handoff().phase().to_string() }))
}

// Handoff handlers

fn handle_paste_link(state: &mut AppState, now: Millis, text: &str) -> IpcResponse {
    info!(len = text.len(), "Sign-in link pasted");
    state.drive_handoff(|handoff, _| handoff.apply_token(now, text, TokenSource::Paste));
    IpcResponse::success(json!({ "phase": state.handoff().phase().to_string() }))
}

fn handle_set_clipboard(state: &AppState, text: Option<String>, denied: bool) -> IpcResponse {
    let has_text = text.is_some();
    state.clipboard().set_text(text);
    state.clipboard().set_denied(denied);
    IpcResponse::success(json!({ "hasText": has_text, "denied": denied }))
}

fn handle_dismiss_banner(state: &mut AppState) -> IpcResponse {
    info!("Banner dismissed");
    state.drive_handoff(|handoff, _| handoff.dismiss_banner());
    IpcResponse::success(json!({ "dismissed": true }))
}

fn handle_dismiss_toast(state: &mut AppState) -> IpcResponse {
    state.drive_handoff(|handoff, _| handoff.dismiss_toast());
    IpcResponse::success(json!({ "dismissed": true }))
}

/// Handle raw text posted by the content side.
pub fn handle_content_message(state: &Arc<Mutex<AppState>>, now: Millis, raw: &str) {
    let Some(message) = receive(raw) else {
        return;
    };
    if message.direction() != Direction::ContentToHost {
        warn!(
            message_type = message.type_name(),
            "Ignoring host-bound message of the wrong direction"
        );
        return;
    }
    let Some(mut state) = lock(state) else {
        return;
    };

    match message {
        Message::CartCount { value } => {
            if state.set_cart_badge(value) {
                debug!(value, "Cart badge updated");
            }
        }
        Message::NavigateTab { tab } => {
            info!(%tab, "Content requested tab switch");
            state.host().navigate_to_tab(tab);
        }
        Message::OpenExternalCheckout {
            url,
            product_id,
            product_name,
        } => {
            let checkout = ExternalCheckout {
                url,
                product_id,
                product_name,
            };
            state.open_external(&checkout, "content");
        }
        message @ (Message::MagicLinkRequested { .. }
        | Message::EmailLinkSent { .. }
        | Message::AccountLoginState { .. }
        | Message::LoginSuccess {}) => {
            state.drive_handoff(|handoff, _| handoff.on_message(now, &message));
        }
        other => {
            warn!(message_type = other.type_name(), "Unhandled content message");
        }
    }
}
