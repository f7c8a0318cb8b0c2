//! Route rules for URL classification.

use crate::classifier::Category;
use regex::Regex;
use url::Url;

/// Case-insensitive pattern matched against a route key (see [`route_key`]).
#[derive(Debug, Clone)]
pub struct RoutePattern {
    /// Pattern source as given.
    pub pattern: String,
    regex: Regex,
}

impl RoutePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("(?i){}", pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Check if a route key matches this pattern.
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

/// Rule mapping a pattern to a route category.
#[derive(Debug, Clone)]
pub struct RouteRule {
    /// Pattern to match.
    pub pattern: RoutePattern,
    /// Category assigned on match.
    pub category: Category,
    /// Priority (higher = first). Equal priorities keep insertion order.
    pub priority: i32,
}

/// Ordered rule list; first match wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

/// Lowercased `path[?query][#fragment]`, the text every rule is matched against.
pub fn route_key(url: &Url) -> String {
    let mut key = url.path().to_string();
    if let Some(query) = url.query() {
        key.push('?');
        key.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        key.push('#');
        key.push_str(fragment);
    }
    key.to_lowercase()
}

const BOUNDARY_END: &str = r"(/|\?|#|$)";

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Rules for hosted storefronts using path or hashbang routing
    /// (`/cart`, `#!/cart`, `/account/orders`, ...).
    pub fn storefront() -> Self {
        let mut table = Self::new();
        let rules: [(&str, Category, i32); 6] = [
            (r"(^|[/!#])checkout", Category::Checkout, 60),
            (r"(^|[/!#])(cart|basket|bag)", Category::Cart, 50),
            (r"(^|[/!#])(orders?|order-history|purchases)", Category::Orders, 40),
            (r"(^|[/!#])(account|profile|signin|sign-in|login)", Category::Profile, 30),
            (r"(^|[/!#])search|[?&]q=", Category::Search, 20),
            (r"^/(#!?/?)?$", Category::Home, 10),
        ];
        for (pattern, category, priority) in rules {
            let full = if category == Category::Home || category == Category::Search {
                pattern.to_string()
            } else {
                format!("{}{}", pattern, BOUNDARY_END)
            };
            match RoutePattern::new(&full) {
                Ok(pattern) => table.add_rule(RouteRule {
                    pattern,
                    category,
                    priority,
                }),
                Err(e) => log::error!("Invalid built-in route pattern {}: {}", full, e),
            }
        }
        table
    }

    /// Add a rule.
    pub fn add_rule(&mut self, rule: RouteRule) {
        self.rules.push(rule);
        // Sort by priority (descending), stable for equal priorities
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Category of the first matching rule.
    pub fn classify_key(&self, key: &str) -> Option<Category> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(key))
            .map(|rule| rule.category)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
