//! Usage logging module
//!
//! Records answered questions and client-reported usage events.

pub mod logger;

pub use logger::{UsageEntry, UsageLogger};
