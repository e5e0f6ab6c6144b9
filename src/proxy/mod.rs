//! Proxy module
//!
//! Handles request forwarding to upstream LLM providers.

pub mod headers;
pub mod invoker;
pub mod logging;

pub use invoker::{RawResponse, UpstreamInvoker};
