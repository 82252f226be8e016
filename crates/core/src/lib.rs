//! Core of the arb-desk proxy: order risk gate and persisted state.
//!
//! This crate has no HTTP dependencies. It provides:
//! - Pre-trade risk checks (credentials, required fields, cost cap, kill
//!   switch) via [`risk::authorize`]
//! - The durable `{focusedMarkets, orders}` snapshot via
//!   [`state::StateStore`], with a bounded 100-entry order history
//! - Environment-driven runtime configuration via [`config::AppConfig`]
//!
//! # Operator notes
//!
//! Order submission is single-attempt with no retries and no idempotency
//! key. A resubmission after an ambiguous upstream failure (timeout,
//! dropped connection) may double-submit: the proxy does not guarantee
//! at-most-once delivery to the exchange.

pub mod config;
pub mod risk;
pub mod state;

pub use config::AppConfig;
pub use risk::{authorize, OrderRejected, PlaceOrderRequest, UpstreamOrder};
pub use state::{OrderRecord, PersistedState, StateError, StateStore, MAX_ORDER_HISTORY};
