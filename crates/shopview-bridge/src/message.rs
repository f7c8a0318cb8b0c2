//! Bridge message types.

use crate::channel::Direction;
use serde::{Deserialize, Serialize};
use shopview_core::{HostTab, Rect};

/// How a sign-in link request was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkSource {
    /// Click on a sign-in / get-link control
    Click,
    /// Outbound request matching a sign-in-link pattern
    Request,
    #[serde(other)]
    Unknown,
}

/// A message crossing the host/content boundary.
///
/// Serialized as `{ "type": "CART_COUNT", "payload": { "value": 3 } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    // Content -> host
    /// Reconciled cart quantity
    CartCount { value: u32 },

    /// Request a host tab switch
    NavigateTab { tab: HostTab },

    /// Request an external-browser handoff
    #[serde(rename_all = "camelCase")]
    OpenExternalCheckout {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_name: Option<String>,
    },

    /// A sign-in link was requested
    MagicLinkRequested { source: LinkSource },

    /// Confirmation probe result
    #[serde(rename_all = "camelCase")]
    EmailLinkSent {
        confirmation_visible: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confirmation_rect: Option<Rect>,
    },

    /// Login heuristic result
    #[serde(rename_all = "camelCase")]
    AccountLoginState {
        logged_in: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        debug: Option<serde_json::Value>,
    },

    /// Explicit success signal
    LoginSuccess {},

    // Host -> content
    /// Surface gained or lost focus
    TabActive { value: bool },

    /// Force an immediate re-check
    Ping {},

    /// Host login state; once logged in the content stops confirmation signals
    #[serde(rename_all = "camelCase")]
    AuthState { logged_in: bool },
}

impl Message {
    /// Direction this message type travels in
    pub fn direction(&self) -> Direction {
        match self {
            Message::TabActive { .. } | Message::Ping {} | Message::AuthState { .. } => {
                Direction::HostToContent
            }
            _ => Direction::ContentToHost,
        }
    }

    /// Wire name of the message type
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::CartCount { .. } => "CART_COUNT",
            Message::NavigateTab { .. } => "NAVIGATE_TAB",
            Message::OpenExternalCheckout { .. } => "OPEN_EXTERNAL_CHECKOUT",
            Message::MagicLinkRequested { .. } => "MAGIC_LINK_REQUESTED",
            Message::EmailLinkSent { .. } => "EMAIL_LINK_SENT",
            Message::AccountLoginState { .. } => "ACCOUNT_LOGIN_STATE",
            Message::LoginSuccess {} => "LOGIN_SUCCESS",
            Message::TabActive { .. } => "TAB_ACTIVE",
            Message::Ping {} => "PING",
            Message::AuthState { .. } => "AUTH_STATE",
        }
    }
}
