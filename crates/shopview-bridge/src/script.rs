//! Scripts evaluated inside the embedded surface.

use crate::codec;
use crate::message::Message;
use shopview_core::ShopviewResult;

/// Installed into every document load. Gives content code a single `post`
/// function regardless of which native bridge the host exposes.
pub const CONTENT_BRIDGE_PRELUDE: &str = r#"
(function() {
    if (window.shopview && window.shopview.__installed) { return; }
    function nativePost(text) {
        if (window.ReactNativeWebView && window.ReactNativeWebView.postMessage) {
            window.ReactNativeWebView.postMessage(text);
        } else if (window.ipc && window.ipc.postMessage) {
            window.ipc.postMessage(text);
        } else if (window.webkit && window.webkit.messageHandlers && window.webkit.messageHandlers.shopview) {
            window.webkit.messageHandlers.shopview.postMessage(text);
        }
    }
    window.shopview = {
        __installed: true,
        post: function(type, payload) {
            try {
                nativePost(JSON.stringify({ type: type, payload: payload || {} }));
            } catch (e) {}
        }
    };
})();
"#;

/// Render the snippet that delivers a host -> content message.
///
/// The message is handed to content listeners as a `message` event whose
/// `data` is the wire text, the same shape a native bridge would produce.
pub fn delivery_script(message: &Message) -> ShopviewResult<String> {
    let raw = codec::encode(message)?;
    // JSON is valid JS except for these two line terminators
    let literal = serde_json::to_string(&raw)?
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    Ok(format!(
        "(function(){{try{{window.dispatchEvent(new MessageEvent('message',{{data:{}}}));}}catch(e){{}}}})();",
        literal
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_script_embeds_wire_text() {
        let script = delivery_script(&Message::TabActive { value: true }).unwrap();
        assert!(script.starts_with("(function(){"));
        assert!(script.contains(r#"\"type\":\"TAB_ACTIVE\""#));
        assert!(script.ends_with("})();"));
    }

    #[test]
    fn test_prelude_is_idempotent() {
        assert!(CONTENT_BRIDGE_PRELUDE.contains("__installed"));
    }
}
