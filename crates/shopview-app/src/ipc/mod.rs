//! Host process protocol.
//!
//! The platform shell talks to the host over newline-delimited JSON. Lines
//! carrying a `cmd` tag are [`HostCommand`]s and get an [`IpcResponse`];
//! anything else is treated as a raw message posted by the content side.
//! Side effects the host performs are reported as [`HostAction`] lines.

pub mod commands;

use serde::{Deserialize, Serialize};
use shopview_auth::Notice;
use shopview_core::HostTab;

/// Command from the platform shell
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum HostCommand {
    // Navigation
    /// Pre-flight: may the surface start loading `url`?
    ShouldStartLoad {
        url: String,
    },
    /// Post-flight: the surface committed a navigation to `url`
    NavigationStateChange {
        url: String,
    },

    // Surface lifecycle
    TabFocus {
        active: bool,
    },
    /// Ask the content side to re-check cart and login state now
    Ping,
    /// App returned to the foreground
    Foreground,

    // Sign-in handoff
    PasteLink {
        text: String,
    },
    /// Clipboard contents as the platform sees them
    SetClipboard {
        text: Option<String>,
        /// The platform refused clipboard access
        #[serde(default)]
        denied: bool,
    },
    DismissBanner,
    DismissToast,

    // Introspection
    GetState,
}

/// Reply to a [`HostCommand`]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcResponse {
    Success { data: serde_json::Value },
    Error { message: String },
}

impl IpcResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        IpcResponse::Success {
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        IpcResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, IpcResponse::Success { .. })
    }
}

/// Something the host did to its UI or surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HostAction {
    LoadUrl { url: String },
    EvaluateScript { script: String },
    OpenExternal { url: String },
    SwitchTab { tab: HostTab },
    CartBadge { count: u32 },
    ShowBanner { top: f64 },
    HideBanner,
    ShowToast { notice: Notice },
    HideToast,
}

/// Snapshot returned by `get_state`
#[derive(Debug, Clone, Serialize)]
pub struct StateInfo {
    pub phase: String,
    pub logged_in: bool,
    pub banner_visible: bool,
    pub banner_dismissed: bool,
    pub cart_badge: Option<u32>,
    pub surface_url: Option<String>,
    pub last_non_cart_url: Option<String>,
}
