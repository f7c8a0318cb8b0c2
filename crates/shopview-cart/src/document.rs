//! What the extractor needs from the embedded document.

use shopview_core::config::BadgeSelector;
use url::Url;

/// Commerce platform API found in the document's global scope.
pub trait CommerceApi {
    /// Cart quantity as reported by the platform, `None` if it did not answer.
    fn cart_quantity(&self) -> Option<u32>;
}

/// Read-only view of the embedded document
pub trait CartDocument {
    fn location(&self) -> Url;

    /// Capability check for the platform API.
    fn commerce_api(&self) -> Option<&dyn CommerceApi>;

    /// Text of the first element matching `selector`.
    fn text_of(&self, selector: &str) -> Option<String>;

    /// Attribute of the first element matching `selector`.
    fn attribute_of(&self, selector: &str, name: &str) -> Option<String>;

    /// Number of elements matching `selector`.
    fn count(&self, selector: &str) -> usize;

    /// Raw badge value for a configured badge selector
    fn read_badge(&self, badge: &BadgeSelector) -> Option<String> {
        match &badge.attribute {
            Some(name) => self.attribute_of(&badge.selector, name),
            None => self.text_of(&badge.selector),
        }
    }
}

/// Parse a badge value: leading digits after trimming (`"3"`, `" 12 "`,
/// `"99+"`). Signs and empty text are not counts.
pub fn parse_count(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
