//! Pre-trade risk gate for inbound order requests.
//!
//! Every order passes through [`authorize`] before anything is sent
//! upstream. Checks run fail-fast in a fixed sequence: credentials,
//! required fields, cost cap, kill switch. A rejection is always a
//! client-side error with a human-readable reason; it performs no
//! upstream call and no persistence.
//!
//! The gate is stateless per call. The kill switch is a per-request flag
//! supplied by the caller, not a server-side toggle: the server trusts
//! whatever the caller sends on each request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time-in-force token sent upstream for every order.
pub const TIME_IN_FORCE: &str = "GTC";

/// Order type used when the caller omits one.
pub const DEFAULT_ORDER_TYPE: &str = "limit";

// =============================================================================
// Request / Payload Types
// =============================================================================

/// An inbound order request, validated and discarded.
///
/// Required fields deserialize with defaults so a missing field and a
/// zero/empty field are indistinguishable to the gate. That mirrors the
/// dashboard's original truthiness check: a price of 0 is rejected as
/// "missing" even though 0 is numerically representable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    /// Market ticker.
    #[serde(default)]
    pub ticker: String,

    /// Side token ("yes"/"no").
    #[serde(default)]
    pub side: String,

    /// Limit price in cents.
    #[serde(default)]
    pub price: u32,

    /// Number of contracts.
    #[serde(default)]
    pub size: u32,

    /// Order type; defaults to "limit".
    #[serde(default, rename = "type")]
    pub order_type: Option<String>,

    /// Caller-supplied ceiling on `price * size`, in cents.
    #[serde(default)]
    pub max_cost_cents: Option<u64>,

    /// Caller-supplied kill switch; true blocks the order unconditionally.
    #[serde(default)]
    pub kill_switch: bool,
}

impl PlaceOrderRequest {
    /// Total cost of the order in cents.
    #[must_use]
    pub fn cost_cents(&self) -> u64 {
        u64::from(self.price) * u64::from(self.size)
    }
}

/// The normalized payload forwarded upstream after approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamOrder {
    /// Market ticker.
    pub ticker: String,

    /// Order type.
    #[serde(rename = "type")]
    pub order_type: String,

    /// Side token.
    pub side: String,

    /// Limit price in cents.
    pub price: u32,

    /// Number of contracts.
    pub size: u32,

    /// Always "GTC".
    pub time_in_force: String,
}

// =============================================================================
// Rejection Reasons
// =============================================================================

/// Why the risk gate refused an order.
///
/// Each variant maps to a client-error HTTP status; none of them are
/// server faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderRejected {
    /// Upstream credentials are not configured; maps to 401.
    #[error("Kalshi credentials are required in KALSHI_API_KEY and KALSHI_API_SECRET")]
    CredentialsMissing,

    /// A required field is missing or zero/empty; maps to 400.
    #[error("ticker, side, price, and size are required")]
    FieldsMissing,

    /// The order's cost exceeds the caller-supplied ceiling; maps to 400.
    #[error("order cost {cost_cents} cents exceeds maxCostCents {max_cents}")]
    CostCapExceeded {
        /// Computed `price * size` in cents.
        cost_cents: u64,
        /// The caller-supplied ceiling in cents.
        max_cents: u64,
    },

    /// The caller engaged the kill switch; maps to 400.
    #[error("kill switch engaged, order placement blocked")]
    KillSwitch,
}

// =============================================================================
// Authorization
// =============================================================================

/// Runs the pre-trade checks and builds the upstream payload.
///
/// Checks run in order and the first violation wins:
/// 1. upstream credentials configured;
/// 2. ticker, side, price, size present and non-zero;
/// 3. `price * size` within `max_cost_cents` when supplied;
/// 4. kill switch disengaged.
///
/// # Errors
/// Returns the first [`OrderRejected`] violation. On rejection nothing
/// has been sent upstream and nothing has been persisted.
pub fn authorize(
    request: &PlaceOrderRequest,
    credentials_present: bool,
) -> Result<UpstreamOrder, OrderRejected> {
    if !credentials_present {
        return Err(OrderRejected::CredentialsMissing);
    }

    if request.ticker.is_empty()
        || request.side.is_empty()
        || request.price == 0
        || request.size == 0
    {
        return Err(OrderRejected::FieldsMissing);
    }

    if let Some(max_cents) = request.max_cost_cents {
        let cost_cents = request.cost_cents();
        if cost_cents > max_cents {
            return Err(OrderRejected::CostCapExceeded {
                cost_cents,
                max_cents,
            });
        }
    }

    if request.kill_switch {
        return Err(OrderRejected::KillSwitch);
    }

    Ok(UpstreamOrder {
        ticker: request.ticker.clone(),
        order_type: request
            .order_type
            .clone()
            .unwrap_or_else(|| DEFAULT_ORDER_TYPE.to_string()),
        side: request.side.clone(),
        price: request.price,
        size: request.size,
        time_in_force: TIME_IN_FORCE.to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
