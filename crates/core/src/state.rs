//! Persisted proxy state: focused markets and bounded order history.
//!
//! The proxy keeps a single JSON snapshot on disk with the shape
//! `{"focusedMarkets": [...], "orders": [...]}`. It is loaded once at
//! startup and rewritten in full after every mutation, so the in-memory
//! and on-disk views never diverge for longer than one request.
//!
//! All mutations go through [`StateStore`], which serializes them behind a
//! single async mutex. Concurrent order placements and focus updates are
//! linearized; no accepted order is ever dropped by a racing writer.
//!
//! # Example
//!
//! ```ignore
//! use arb_desk_core::state::StateStore;
//! use std::path::PathBuf;
//!
//! let store = StateStore::load(PathBuf::from("data/state.json"));
//!
//! let focused = store.set_focus(vec!["KXBTC-TEST".into()]).await?;
//! let record = store
//!     .record_order("KXBTC-TEST", "yes", 45, 10, None, None)
//!     .await?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Maximum number of order records retained in history.
///
/// Appending beyond this evicts the oldest record.
pub const MAX_ORDER_HISTORY: usize = 100;

/// Status recorded when the upstream response omits one.
pub const DEFAULT_ORDER_STATUS: &str = "submitted";

// =============================================================================
// Errors
// =============================================================================

/// Errors from state persistence operations.
///
/// Save failures are always surfaced to the mutating caller so it can
/// report lost durability instead of silently dropping it.
#[derive(Debug, Error)]
pub enum StateError {
    /// IO error reading/writing the snapshot file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Persisted Types
// =============================================================================

/// A single accepted order, immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Market ticker the order was placed on.
    pub ticker: String,

    /// Side token as sent upstream ("yes"/"no").
    pub side: String,

    /// Limit price in cents (1-99).
    pub price: u32,

    /// Number of contracts.
    pub size: u32,

    /// When the proxy accepted the order.
    pub submitted_at: DateTime<Utc>,

    /// Status reported by the upstream, or "submitted" if it omitted one.
    pub status: String,

    /// Upstream-assigned order id, when one was returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

/// The durable snapshot: focus set plus bounded order history.
///
/// `orders` is newest-first. The serialized field names match the
/// dashboard's wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Markets the operator has chosen to monitor.
    #[serde(rename = "focusedMarkets", default)]
    pub focused_markets: BTreeSet<String>,

    /// Accepted orders, newest first, at most [`MAX_ORDER_HISTORY`].
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
}

// =============================================================================
// StateStore
// =============================================================================

/// Owns the snapshot file and the in-memory state behind a single mutex.
///
/// The store is the only component permitted to touch the snapshot file.
/// Handlers receive it as an injected `Arc<StateStore>`; there is no
/// ambient/static state.
#[derive(Debug)]
pub struct StateStore {
    /// Path to the snapshot file.
    path: PathBuf,

    /// Guarded state; every read-modify-write holds this across the save.
    state: Mutex<PersistedState>,
}

impl StateStore {
    /// Loads the store from disk, or starts with defaults.
    ///
    /// A missing file is not an error. A corrupt or unreadable file is
    /// logged and discarded; startup never fails on bad state.
    #[must_use]
    pub fn load(path: PathBuf) -> Self {
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<PersistedState>(&raw) {
                Ok(state) => {
                    info!(
                        path = %path.display(),
                        focused = state.focused_markets.len(),
                        orders = state.orders.len(),
                        "Loaded persisted state"
                    );
                    state
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to parse persisted state, starting fresh"
                    );
                    PersistedState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No persisted state file found, starting fresh");
                PersistedState::default()
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read persisted state, starting fresh"
                );
                PersistedState::default()
            }
        };

        Self {
            path,
            state: Mutex::new(state),
        }
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Records an accepted order and flushes the snapshot.
    ///
    /// Prepends the record (newest first), truncates history to
    /// [`MAX_ORDER_HISTORY`], and rewrites the snapshot before returning.
    /// Call this only after the upstream accepted the order.
    ///
    /// # Errors
    /// Returns [`StateError`] if the snapshot cannot be written. The order
    /// is still in memory in that case; the caller decides how to report
    /// the lost durability.
    pub async fn record_order(
        &self,
        ticker: impl Into<String>,
        side: impl Into<String>,
        price: u32,
        size: u32,
        status: Option<String>,
        order_id: Option<String>,
    ) -> Result<OrderRecord, StateError> {
        let record = OrderRecord {
            ticker: ticker.into(),
            side: side.into(),
            price,
            size,
            submitted_at: Utc::now(),
            status: status.unwrap_or_else(|| DEFAULT_ORDER_STATUS.to_string()),
            order_id,
        };

        let mut state = self.state.lock().await;
        state.orders.insert(0, record.clone());
        state.orders.truncate(MAX_ORDER_HISTORY);
        self.save(&state).await?;

        debug!(
            ticker = %record.ticker,
            side = %record.side,
            history = state.orders.len(),
            "Recorded order"
        );

        Ok(record)
    }

    /// Replaces the focus set wholesale with the deduplicated input.
    ///
    /// Market ids are not validated against any known-market list; any
    /// string is accepted. Returns the resulting set in sorted order.
    ///
    /// # Errors
    /// Returns [`StateError`] if the snapshot cannot be written.
    pub async fn set_focus(&self, market_ids: Vec<String>) -> Result<Vec<String>, StateError> {
        let mut state = self.state.lock().await;
        state.focused_markets = market_ids.into_iter().collect();
        self.save(&state).await?;

        debug!(focused = state.focused_markets.len(), "Replaced focus set");

        Ok(state.focused_markets.iter().cloned().collect())
    }

    /// Returns the current focus set in sorted order.
    pub async fn focused_markets(&self) -> Vec<String> {
        self.state.lock().await.focused_markets.iter().cloned().collect()
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> PersistedState {
        self.state.lock().await.clone()
    }

    /// Writes the current state to disk.
    ///
    /// Used as the teardown flush on graceful shutdown.
    ///
    /// # Errors
    /// Returns [`StateError`] if the snapshot cannot be written.
    pub async fn flush(&self) -> Result<(), StateError> {
        let state = self.state.lock().await;
        self.save(&state).await
    }

    /// Serializes and rewrites the full snapshot file.
    ///
    /// Must be called with the state lock held so writers cannot
    /// interleave. Creates the parent directory on first write.
    async fn save(&self, state: &PersistedState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let raw = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, raw).await?;

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Creates a temp directory and returns a path to a snapshot file in it.
    fn temp_path() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        (dir, path)
    }

    async fn record(store: &StateStore, ticker: &str) -> OrderRecord {
        store
            .record_order(ticker, "yes", 45, 10, None, None)
            .await
            .unwrap()
    }

    // ==================== History Cap Tests ====================

    #[tokio::test]
    async fn test_history_newest_first() {
        let (_dir, path) = temp_path();
        let store = StateStore::load(path);

        record(&store, "FIRST").await;
        record(&store, "SECOND").await;
        record(&store, "THIRD").await;

        let state = store.snapshot().await;
        let tickers: Vec<&str> = state.orders.iter().map(|o| o.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["THIRD", "SECOND", "FIRST"]);
    }

    #[tokio::test]
    async fn test_history_capped_at_100() {
        let (_dir, path) = temp_path();
        let store = StateStore::load(path);

        for i in 0..101 {
            record(&store, &format!("MKT-{i}")).await;
        }

        let state = store.snapshot().await;
        assert_eq!(state.orders.len(), MAX_ORDER_HISTORY);
        // Order 101 evicted order 1
        assert_eq!(state.orders[0].ticker, "MKT-100");
        assert_eq!(state.orders[99].ticker, "MKT-1");
        assert!(!state.orders.iter().any(|o| o.ticker == "MKT-0"));
    }

    #[tokio::test]
    async fn test_record_defaults_status_to_submitted() {
        let (_dir, path) = temp_path();
        let store = StateStore::load(path);

        let with_default = record(&store, "A").await;
        assert_eq!(with_default.status, "submitted");
        assert!(with_default.order_id.is_none());

        let explicit = store
            .record_order("B", "no", 30, 5, Some("resting".into()), Some("ord-1".into()))
            .await
            .unwrap();
        assert_eq!(explicit.status, "resting");
        assert_eq!(explicit.order_id.as_deref(), Some("ord-1"));
    }

    // ==================== Focus Set Tests ====================

    #[tokio::test]
    async fn test_set_focus_dedupes() {
        let (_dir, path) = temp_path();
        let store = StateStore::load(path);

        let focused = store
            .set_focus(vec!["A".into(), "B".into(), "A".into()])
            .await
            .unwrap();

        assert_eq!(focused, vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_set_focus_replaces_not_merges() {
        let (_dir, path) = temp_path();
        let store = StateStore::load(path);

        store.set_focus(vec!["A".into(), "B".into()]).await.unwrap();
        let focused = store.set_focus(vec![]).await.unwrap();

        assert!(focused.is_empty());
        assert!(store.focused_markets().await.is_empty());
    }

    // ==================== Round-trip Tests ====================

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let (_dir, path) = temp_path();

        {
            let store = StateStore::load(path.clone());
            store.set_focus(vec!["A".into(), "B".into()]).await.unwrap();
            store
                .record_order("KXBTC-TEST", "yes", 45, 10, Some("resting".into()), Some("ord-1".into()))
                .await
                .unwrap();
        }

        // Simulated restart
        let reloaded = StateStore::load(path);
        let state = reloaded.snapshot().await;

        assert_eq!(
            state.focused_markets,
            ["A", "B"].iter().map(|s| s.to_string()).collect()
        );
        assert_eq!(state.orders.len(), 1);
        assert_eq!(state.orders[0].ticker, "KXBTC-TEST");
        assert_eq!(state.orders[0].order_id.as_deref(), Some("ord-1"));
    }

    #[tokio::test]
    async fn test_snapshot_file_layout() {
        let (_dir, path) = temp_path();
        let store = StateStore::load(path.clone());

        store.set_focus(vec!["A".into()]).await.unwrap();
        record(&store, "KXBTC-TEST").await;

        let raw = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert!(json["focusedMarkets"].is_array());
        assert!(json["orders"].is_array());
        assert!(json["orders"][0]["submitted_at"].is_string()); // ISO 8601
        // Pretty-printed, not a single line
        assert!(raw.contains('\n'));
    }

    // ==================== Load Failure Tests ====================

    #[tokio::test]
    async fn test_missing_file_starts_fresh() {
        let (_dir, path) = temp_path();
        assert!(!path.exists());

        let store = StateStore::load(path);
        let state = store.snapshot().await;

        assert!(state.focused_markets.is_empty());
        assert!(state.orders.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_fresh() {
        let (_dir, path) = temp_path();
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"not valid json {{{").unwrap();

        let store = StateStore::load(path);
        let state = store.snapshot().await;

        assert!(state.orders.is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let store = StateStore::load(path.clone());

        record(&store, "A").await;

        assert!(path.exists());
    }

    // ==================== Save Failure Tests ====================

    #[tokio::test]
    async fn test_save_failure_propagates() {
        let dir = TempDir::new().unwrap();
        // Pointing the snapshot at a directory makes every write fail.
        let store = StateStore::load(dir.path().to_path_buf());

        let result = store.record_order("A", "yes", 45, 10, None, None).await;
        assert!(result.is_err());

        let result = store.set_focus(vec!["A".into()]).await;
        assert!(result.is_err());
    }

    // ==================== Concurrency Tests ====================

    #[tokio::test]
    async fn test_concurrent_orders_both_recorded() {
        let (_dir, path) = temp_path();
        let store = Arc::new(StateStore::load(path.clone()));

        let a = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store.record_order("A", "yes", 45, 10, None, None).await
            })
        };
        let b = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store.record_order("B", "no", 55, 20, None, None).await
            })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.orders.len(), 2);
        assert_eq!(
            state.orders.iter().filter(|o| o.ticker == "A").count(),
            1
        );
        assert_eq!(
            state.orders.iter().filter(|o| o.ticker == "B").count(),
            1
        );

        // Disk matches memory after the race
        let reloaded = StateStore::load(path);
        assert_eq!(reloaded.snapshot().await.orders.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_focus_and_order() {
        let (_dir, path) = temp_path();
        let store = Arc::new(StateStore::load(path));

        let order = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store.record_order("A", "yes", 45, 10, None, None).await
            })
        };
        let focus = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.set_focus(vec!["A".into(), "B".into()]).await })
        };

        order.await.unwrap().unwrap();
        focus.await.unwrap().unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.orders.len(), 1);
        assert_eq!(state.focused_markets.len(), 2);
    }
}
