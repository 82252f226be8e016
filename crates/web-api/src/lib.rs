//! REST API for the arb-desk proxy.
//!
//! Exposes the order-placement and focus-set endpoints over axum, plus
//! normalized read passthroughs for the dashboard.

pub mod handlers;
pub mod server;

pub use handlers::{ApiError, AppState};
pub use server::ApiServer;
