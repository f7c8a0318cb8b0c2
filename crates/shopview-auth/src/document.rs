//! Read-only view of the embedded document used by the auth heuristics.

use regex::Regex;
use shopview_core::Rect;

pub trait AuthDocument {
    /// Visible text of the whole page
    fn body_text(&self) -> String;

    /// Whether any element matches `selector`
    fn exists(&self, selector: &str) -> bool;

    /// Bounding box of the first element matching `selector`
    fn element_rect(&self, selector: &str) -> Option<Rect>;

    /// Bounding box of the innermost element whose text matches `pattern`
    fn text_rect(&self, pattern: &Regex) -> Option<Rect>;

    /// Cookie name or local/session storage key present
    fn has_storage_key(&self, key: &str) -> bool;
}

/// Compile case-insensitive patterns, skipping invalid ones.
pub(crate) fn compile_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(&format!("(?i){}", p)) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(pattern = %p, error = %e, "Skipping invalid pattern");
                None
            }
        })
        .collect()
}
