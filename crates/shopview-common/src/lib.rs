//! # Shopview Common
//!
//! Utilities shared by both sides of the bridge.
//!
//! ## Features
//!
//! - Logging configuration and setup
//! - A clear-and-ignore timer queue for single-threaded event loops
//! - Trailing debouncer
//! - Two-phase polling schedule

pub mod backoff;
pub mod debounce;
pub mod logging;
pub mod timer;

pub use backoff::PollSchedule;
pub use debounce::Debouncer;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use timer::{Fired, TimerHandle, TimerQueue};
