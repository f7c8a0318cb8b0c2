//! Navigation classification and redirection for embedded store surfaces.
//!
//! The same [`Classifier`] is consulted before a load starts (the only point
//! where it can be cancelled) and after navigation state changes (side
//! effects only).

pub mod classifier;
pub mod hash_guard;
pub mod intent;
pub mod redirector;
pub mod rules;

pub use classifier::{Category, Classifier, NavAction, NavigationDecision};
pub use hash_guard::{HashGuard, HashOutcome};
pub use intent::{ClickOutcome, ClickTarget, ExternalCheckout, ProductMatcher, PurchaseIntent};
pub use redirector::{NavEffect, NavigationRedirector, Preflight};
pub use rules::{RoutePattern, RouteRule, RouteTable};
