//! # Shopview Auth
//!
//! Passwordless sign-in across two contexts: the email client where the link
//! arrives and the embedded store where it must be opened.
//!
//! Host side: [`HandoffMachine`] with its clipboard cooldown and token
//! normalization. Content side: [`LinkRequestDetector`],
//! [`ConfirmationProbe`] and [`LoginDetector`], which only ever report
//! through bridge messages.

pub mod cooldown;
pub mod detect;
pub mod document;
pub mod handoff;
pub mod login;
pub mod probe;
pub mod token;

pub use cooldown::{ClipboardCooldown, CooldownRecord, COOLDOWN_KEY};
pub use detect::LinkRequestDetector;
pub use document::AuthDocument;
pub use handoff::{
    Clipboard, HandoffEffect, HandoffMachine, HandoffPhase, HandoffState, Notice, TokenSource,
};
pub use login::{LoginDetector, LoginSignal, LoginVerdict};
pub use probe::{ConfirmationProbe, ProbeHit};
pub use token::{token_hash, TokenNormalizer};
