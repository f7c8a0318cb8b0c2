//! # Shopview Cart
//!
//! Derives the cart quantity from an embedded store document and reports it
//! to the host as `CART_COUNT`, only when it is new information.
//!
//! Strategies, first success wins per check:
//!
//! 1. the store's own commerce API, when the document exposes one
//! 2. badge selectors, in configured order
//! 3. item rows, only on the cart page
//!
//! A zero read on the cart page is held back until emptiness is confirmed.

pub mod document;
pub mod extractor;
pub mod state;
pub mod store;

pub use document::{parse_count, CartDocument, CommerceApi};
pub use extractor::{CartExtractor, CartTimer};
pub use state::{CartState, ReadSource, Reading};
pub use store::LruSessionStore;
