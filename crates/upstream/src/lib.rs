//! Upstream API integration for the arb-desk proxy.
//!
//! This crate provides the single HTTP seam between the proxy and the
//! external trading API:
//! - Basic auth header construction from configured credentials
//! - A tagged [`UpstreamOutcome`] so "204 no content" and "upstream
//!   failed" are never conflated
//! - An explicit 10 second per-request timeout, surfaced as a distinct
//!   error
//!
//! There are no retries: every call is a single attempt, and the caller
//! decides whether to resubmit.

pub mod client;
pub mod error;

pub use client::{
    UpstreamClient, UpstreamConfig, UpstreamOutcome, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
};
pub use error::{Result, UpstreamError};
