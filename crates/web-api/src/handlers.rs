//! HTTP handlers for the proxy API.
//!
//! The mutating endpoints (`/api/orders`, `/api/arbitrage/focus`) are the
//! core: risk gate, upstream submission, order recording, focus updates.
//! The read endpoints are passthroughs that normalize upstream field
//! aliases into the dashboard's shape.

use arb_desk_core::risk::{authorize, OrderRejected, PlaceOrderRequest};
use arb_desk_core::state::StateStore;
use arb_desk_upstream::{UpstreamClient, UpstreamOutcome};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, warn};

/// Warning attached to an order response when the trade was accepted
/// upstream but the local history write failed.
pub const DURABILITY_WARNING: &str = "history not durably recorded";

// =============================================================================
// Shared State
// =============================================================================

/// State handle injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Persisted state store; sole owner of the snapshot file.
    pub store: Arc<StateStore>,

    /// Upstream API client.
    pub upstream: Arc<UpstreamClient>,

    /// Market categories the markets endpoint surfaces.
    pub allowed_categories: Arc<Vec<String>>,
}

// =============================================================================
// Error Responses
// =============================================================================

/// API error response: JSON `{"error": ...}` with an appropriate status.
///
/// Upstream failure text never reaches the caller; it goes to server
/// logs only.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status to return.
    pub status: StatusCode,

    /// Human-readable reason, returned in the body.
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<OrderRejected> for ApiError {
    fn from(rejection: OrderRejected) -> Self {
        match rejection {
            OrderRejected::CredentialsMissing => Self::unauthorized(rejection.to_string()),
            _ => Self::bad_request(rejection.to_string()),
        }
    }
}

// =============================================================================
// Order Placement
// =============================================================================

/// Places an order: risk gate, upstream submission, history record.
///
/// The response is not sent until the history write has either succeeded
/// or failed; a failed write after an upstream accept still reports the
/// trade but carries a durability warning, since the trade cannot be
/// reversed.
///
/// # Errors
/// 400 on validation/cost-cap/kill-switch rejection, 401 on missing
/// credentials, 502 on any upstream failure (including a bodyless 204,
/// which is not proof an order was placed).
pub async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<Json<Value>, ApiError> {
    let payload = authorize(&request, state.upstream.has_credentials())?;

    let outcome = state
        .upstream
        .post("/orders", &payload)
        .await
        .map_err(|e| {
            error!(error = %e, ticker = %payload.ticker, "Order submission failed");
            ApiError::bad_gateway(format!("upstream request failed: {e}"))
        })?;

    let body = match outcome {
        UpstreamOutcome::Success(body) => body,
        UpstreamOutcome::NoContent => {
            // A 204 carries no order; claiming "placed" here would be a lie.
            warn!(ticker = %payload.ticker, "Upstream returned 204 for order submission");
            return Err(ApiError::bad_gateway(
                "upstream returned no order body; order state unknown",
            ));
        }
        UpstreamOutcome::Failure { status, .. } => {
            return Err(ApiError::bad_gateway(format!(
                "order rejected by upstream (status {status})"
            )));
        }
    };

    // The upstream may nest the order under "order" or return it flat.
    let order = body.get("order").filter(|v| v.is_object()).unwrap_or(&body);
    let status = order
        .get("status")
        .and_then(Value::as_str)
        .map(String::from);
    let order_id = order
        .get("order_id")
        .and_then(Value::as_str)
        .map(String::from);

    match state
        .store
        .record_order(
            payload.ticker.clone(),
            payload.side.clone(),
            payload.price,
            payload.size,
            status,
            order_id,
        )
        .await
    {
        Ok(_) => Ok(Json(json!({ "order": body }))),
        Err(e) => {
            // Trade is already accepted upstream and cannot be reversed.
            error!(error = %e, ticker = %payload.ticker, "Failed to persist order history");
            Ok(Json(json!({ "order": body, "warning": DURABILITY_WARNING })))
        }
    }
}

// =============================================================================
// Focus Set
// =============================================================================

/// Body for focus updates. `marketIds` stays a raw value so non-array
/// input can be ignored rather than rejected, matching the dashboard's
/// existing contract.
#[derive(Debug, Deserialize)]
pub struct FocusRequest {
    #[serde(rename = "marketIds", default)]
    pub market_ids: Value,
}

/// Replaces the focus set and returns the result.
///
/// Non-array or missing `marketIds` leaves the set untouched and returns
/// the current one.
///
/// # Errors
/// 500 if the replacement cannot be persisted.
pub async fn set_focus(
    State(state): State<AppState>,
    Json(request): Json<FocusRequest>,
) -> Result<Json<Value>, ApiError> {
    let focused = match request.market_ids.as_array() {
        Some(ids) => {
            let ids: Vec<String> = ids
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect();
            state.store.set_focus(ids).await.map_err(|e| {
                error!(error = %e, "Failed to persist focus set");
                ApiError::internal(format!("failed to persist focus set: {e}"))
            })?
        }
        None => state.store.focused_markets().await,
    };

    Ok(Json(json!({ "focused": focused })))
}

// =============================================================================
// Read Passthroughs
// =============================================================================

/// Returns the first non-null value among `keys` in `obj`, or `Null`.
fn first_of(obj: &Value, keys: &[&str]) -> Value {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null)
}

/// Lists active markets across the allowed categories, de-duplicated by
/// ticker and normalized to the dashboard's shape.
///
/// # Errors
/// 401 without credentials. Per-category upstream failures are logged
/// and skipped rather than failing the whole response.
pub async fn list_markets(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if !state.upstream.has_credentials() {
        return Err(OrderRejected::CredentialsMissing.into());
    }

    let mut markets = Vec::new();
    let mut seen = HashSet::new();

    for category in state.allowed_categories.iter() {
        let path = format!("/markets?category={category}&status=active&limit=200");
        let outcome = match state.upstream.get(&path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, category = %category, "Market fetch failed");
                continue;
            }
        };

        let Some(body) = outcome.into_success() else {
            continue;
        };
        let Some(raw_markets) = body.get("markets").and_then(Value::as_array) else {
            continue;
        };

        for m in raw_markets {
            let market_id = first_of(m, &["ticker", "id"]);
            let Some(id) = market_id.as_str() else {
                continue;
            };
            if !seen.insert(id.to_string()) {
                continue;
            }

            let volume = match first_of(m, &["volume", "yes_volume"]) {
                Value::Null => json!(0),
                v => v,
            };
            let status = match first_of(m, &["state", "status"]) {
                Value::Null => json!("active"),
                v => v,
            };
            let market_category = match first_of(m, &["category"]) {
                Value::Null => json!(category),
                v => v,
            };

            markets.push(json!({
                "market_id": market_id,
                "title": first_of(m, &["name", "title"]),
                "yes_price": first_of(m, &["yes_price", "last_yes_price"]),
                "no_price": first_of(m, &["no_price", "last_no_price"]),
                "volume": volume,
                "status": status,
                "category": market_category,
            }));
        }
    }

    Ok(Json(json!({ "markets": markets })))
}

/// Lists open upstream orders as dashboard trades.
///
/// # Errors
/// 401 without credentials. An upstream failure yields an empty list,
/// matching the dashboard's existing contract.
pub async fn list_trades(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if !state.upstream.has_credentials() {
        return Err(OrderRejected::CredentialsMissing.into());
    }

    let orders = match state.upstream.get("/orders?status=open").await {
        Ok(outcome) => outcome
            .into_success()
            .and_then(|body| body.get("orders").and_then(Value::as_array).cloned())
            .unwrap_or_default(),
        Err(e) => {
            error!(error = %e, "Open order fetch failed");
            Vec::new()
        }
    };

    let trades: Vec<Value> = orders
        .iter()
        .map(|o| {
            let strategy = match first_of(o, &["strategy"]) {
                Value::Null => json!("live_order"),
                v => v,
            };
            json!({
                "market_id": first_of(o, &["ticker", "market_ticker"]),
                "strategy_type": strategy,
                "entry_leg": first_of(o, &["side", "direction"]),
                "entry_price": first_of(o, &["price", "limit_price"]),
                "quantity": first_of(o, &["size", "quantity"]),
                "current_status": first_of(o, &["status"]),
                "total_cost_basis": first_of(o, &["cost_basis"]),
                "potential_profit": first_of(o, &["max_profit"]),
            })
        })
        .collect();

    Ok(Json(json!({ "trades": trades })))
}

// =============================================================================
// Health
// =============================================================================

/// Liveness probe; usable without credentials.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// =============================================================================
// Tests
// =============================================================================
